//! Event ingestion: the storefront reports what happened, matching
//! automations enroll the recipient.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use mailflow_app::ports::{AutomationRepository, EmailTransport, QueueRepository};
use mailflow_domain::event::{Event, EventType};
use mailflow_domain::error::ValidationError;
use mailflow_domain::id::{AutomationId, EventId};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /api/events`.
#[derive(Deserialize)]
pub struct IngestRequest {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub event_id: EventId,
    /// Automations that scheduled at least one email for the recipient.
    pub enrolled: Vec<AutomationId>,
}

/// `POST /api/events` — route a domain event to matching automations.
pub async fn ingest<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let event_type: EventType = req.event_type.parse().map_err(ValidationError::from)?;
    let event = Event::new(event_type, req.payload);
    let enrolled = state.trigger_router.on_event(&event).await?;
    Ok(Json(IngestResponse {
        event_id: event.id,
        enrolled,
    }))
}
