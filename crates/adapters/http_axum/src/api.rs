//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod automations;
#[allow(clippy::missing_errors_doc)]
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod queue;

use std::str::FromStr;

use axum::Router;
use axum::routing::{delete, get, patch, post};

use mailflow_app::ports::{AutomationRepository, EmailTransport, QueueRepository};
use mailflow_domain::error::ValidationError;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<A, Q, T>() -> Router<AppState<A, Q, T>>
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    Router::new()
        // Automations
        .route(
            "/automations",
            get(automations::list::<A, Q, T>).post(automations::create::<A, Q, T>),
        )
        .route("/automations/seed", post(automations::seed::<A, Q, T>))
        .route(
            "/automations/placeholders",
            get(automations::placeholders),
        )
        .route(
            "/automations/{id}",
            get(automations::get::<A, Q, T>)
                .put(automations::update::<A, Q, T>)
                .delete(automations::delete::<A, Q, T>),
        )
        .route(
            "/automations/{id}/status",
            patch(automations::set_status::<A, Q, T>),
        )
        .route(
            "/automations/{id}/enabled",
            patch(automations::set_enabled::<A, Q, T>),
        )
        .route(
            "/automations/{id}/enroll",
            post(automations::enroll::<A, Q, T>),
        )
        // Queue
        .route("/automations/queue/stats", get(queue::stats::<A, Q, T>))
        .route("/automations/queue/all", get(queue::list::<A, Q, T>))
        .route("/automations/queue/process", post(queue::process::<A, Q, T>))
        .route(
            "/automations/queue/{id}/retry",
            post(queue::retry::<A, Q, T>),
        )
        .route("/automations/queue/{id}", delete(queue::cancel::<A, Q, T>))
        // Events
        .route("/events", post(events::ingest::<A, Q, T>))
}

/// Parse a path identifier, reporting a malformed one as a validation error.
fn parse_id<I: FromStr>(raw: &str) -> Result<I, ApiError> {
    I::from_str(raw).map_err(|_| ValidationError::InvalidId(raw.to_string()).into())
}
