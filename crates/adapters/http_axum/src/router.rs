//! Axum router assembly.

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use mailflow_app::ports::{AutomationRepository, EmailTransport, QueueRepository};

use crate::auth::{ApiTokens, require_bearer};
use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api`, guarded by the bearer token check,
/// next to an unauthenticated `/health`. Includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level.
pub fn build<A, Q, T>(state: AppState<A, Q, T>, tokens: ApiTokens) -> Router
where
    A: AutomationRepository + Clone + Send + Sync + 'static,
    Q: QueueRepository + Clone + Send + Sync + 'static,
    T: EmailTransport + Send + Sync + 'static,
{
    let api = crate::api::routes().route_layer(middleware::from_fn_with_state(
        tokens,
        require_bearer,
    ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
