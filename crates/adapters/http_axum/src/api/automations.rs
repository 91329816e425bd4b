//! JSON REST handlers for automations.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use mailflow_app::ports::{AutomationRepository, EmailTransport, QueueRepository};
use mailflow_domain::automation::{
    Automation, AutomationBuilder, AutomationContent, AutomationStatus, Trigger,
};
use mailflow_domain::id::AutomationId;
use mailflow_domain::placeholder::{KNOWN_PLACEHOLDERS, Variables};
use mailflow_domain::queue::QueueItem;
use mailflow_domain::recipient::Recipient;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating or replacing an automation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRequest {
    pub name: String,
    pub description: Option<String>,
    pub trigger: Option<Trigger>,
    pub status: Option<AutomationStatus>,
    pub enabled: Option<bool>,
    #[serde(default)]
    pub one_time_per_recipient: bool,
    pub content: AutomationContent,
}

impl AutomationRequest {
    fn into_builder(self) -> AutomationBuilder {
        let mut builder = Automation::builder()
            .name(self.name)
            .trigger(self.trigger.unwrap_or(Trigger::Manual))
            .one_time_per_recipient(self.one_time_per_recipient)
            .content(self.content);
        if let Some(description) = self.description {
            builder = builder.description(description);
        }
        if let Some(status) = self.status {
            builder = builder.status(status);
        }
        if let Some(enabled) = self.enabled {
            builder = builder.enabled(enabled);
        }
        builder
    }
}

/// Request body for `PATCH /api/automations/{id}/status`.
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: AutomationStatus,
}

/// Request body for `PATCH /api/automations/{id}/enabled`.
#[derive(Deserialize)]
pub struct EnabledRequest {
    pub enabled: bool,
}

/// Request body for manual enrollment.
#[derive(Deserialize)]
pub struct EnrollRequest {
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub variables: Variables,
}

/// Response body of the seed endpoint.
#[derive(Serialize)]
pub struct SeedResponse {
    pub created: usize,
    pub automations: Vec<Automation>,
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Automation>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/automations` — list all automations.
pub async fn list<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
) -> Result<Json<Vec<Automation>>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let automations = state.automation_service.list_automations().await?;
    Ok(Json(automations))
}

/// `GET /api/automations/{id}` — get automation by ID.
pub async fn get<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Path(id): Path<String>,
) -> Result<Json<Automation>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let id: AutomationId = parse_id(&id)?;
    let automation = state.automation_service.get_automation(id).await?;
    Ok(Json(automation))
}

/// `POST /api/automations` — create a new automation.
pub async fn create<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Json(req): Json<AutomationRequest>,
) -> Result<CreateResponse, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let automation = req.into_builder().build()?;
    let created = state
        .automation_service
        .create_automation(automation)
        .await?;
    Ok(CreateResponse::Created(Json(created)))
}

/// `PUT /api/automations/{id}` — replace an existing automation.
pub async fn update<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Path(id): Path<String>,
    Json(req): Json<AutomationRequest>,
) -> Result<Json<Automation>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let id: AutomationId = parse_id(&id)?;
    let automation = req.into_builder().id(id).build()?;
    let updated = state
        .automation_service
        .update_automation(automation)
        .await?;
    Ok(Json(updated))
}

/// `DELETE /api/automations/{id}` — delete an automation and cancel its
/// scheduled emails.
pub async fn delete<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let id: AutomationId = parse_id(&id)?;
    state.automation_service.delete_automation(id).await?;
    Ok(DeleteResponse::NoContent)
}

/// `PATCH /api/automations/{id}/status` — pause or resume.
pub async fn set_status<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Automation>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let id: AutomationId = parse_id(&id)?;
    let automation = state.automation_service.set_status(id, req.status).await?;
    Ok(Json(automation))
}

/// `PATCH /api/automations/{id}/enabled` — enable or disable.
pub async fn set_enabled<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Path(id): Path<String>,
    Json(req): Json<EnabledRequest>,
) -> Result<Json<Automation>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let id: AutomationId = parse_id(&id)?;
    let automation = state
        .automation_service
        .set_enabled(id, req.enabled)
        .await?;
    Ok(Json(automation))
}

/// `POST /api/automations/seed` — create the missing built-in automations.
pub async fn seed<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
) -> Result<Json<SeedResponse>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let outcome = state.automation_service.seed_defaults().await?;
    Ok(Json(SeedResponse {
        created: outcome.created,
        automations: outcome.automations,
    }))
}

/// `POST /api/automations/{id}/enroll` — enroll one recipient directly.
pub async fn enroll<A, Q, T>(
    State(state): State<AppState<A, Q, T>>,
    Path(id): Path<String>,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<Vec<QueueItem>>, ApiError>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let id: AutomationId = parse_id(&id)?;
    let recipient = Recipient::new(&req.email, req.name)?.with_variables(req.variables);
    let items = state.trigger_router.enroll(id, &recipient).await?;
    Ok(Json(items))
}

/// `GET /api/automations/placeholders` — well-known placeholder names.
pub async fn placeholders() -> Json<Vec<&'static str>> {
    Json(KNOWN_PLACEHOLDERS.to_vec())
}
