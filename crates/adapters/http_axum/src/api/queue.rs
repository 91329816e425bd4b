//! JSON REST handlers for the email queue.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use mailflow_app::ports::{AutomationRepository, EmailTransport, QueueFilter, QueueRepository};
use mailflow_domain::id::QueueItemId;
use mailflow_domain::queue::{ProcessSummary, QueueItem, QueueStats, QueueStatus};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters of `GET /api/automations/queue/all`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub automation_id: Option<String>,
    pub limit: Option<usize>,
}

impl ListQuery {
    fn into_filter(self) -> Result<QueueFilter, ApiError> {
        Ok(QueueFilter {
            status: self
                .status
                .map(|s| s.parse::<QueueStatus>())
                .transpose()?,
            automation_id: self.automation_id.as_deref().map(parse_id).transpose()?,
            limit: self.limit,
        })
    }
}

/// `GET /api/automations/queue/stats` — item count per status.
pub async fn stats<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
) -> Result<Json<QueueStats>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    Ok(Json(state.queue_inspector.stats().await?))
}

/// `GET /api/automations/queue/all` — list items, newest schedule first.
pub async fn list<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<QueueItem>>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let items = state.queue_inspector.list(query.into_filter()?).await?;
    Ok(Json(items))
}

/// `POST /api/automations/queue/process` — dispatch every due item now.
///
/// Delivery failures are recorded on the items and counted in the summary.
pub async fn process<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
) -> Result<Json<ProcessSummary>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    Ok(Json(state.queue_processor.process_queue().await?))
}

/// `POST /api/automations/queue/{id}/retry` — reschedule a failed item.
pub async fn retry<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Path(id): Path<String>,
) -> Result<Json<QueueItem>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let id: QueueItemId = parse_id(&id)?;
    Ok(Json(state.retry_manager.retry(id).await?))
}

/// `DELETE /api/automations/queue/{id}` — cancel a scheduled item.
pub async fn cancel<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Path(id): Path<String>,
) -> Result<Json<QueueItem>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let id: QueueItemId = parse_id(&id)?;
    Ok(Json(state.retry_manager.cancel(id).await?))
}
