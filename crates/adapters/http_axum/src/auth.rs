//! Bearer token check for the `/api` routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

/// Tokens accepted in `Authorization: Bearer <token>`.
///
/// An empty set leaves the API open.
#[derive(Debug, Clone, Default)]
pub struct ApiTokens(Arc<[String]>);

impl ApiTokens {
    #[must_use]
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self(
            tokens
                .into_iter()
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .into(),
        )
    }

    /// `true` when no token is configured.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0.is_empty()
    }

    fn accepts(&self, candidate: &str) -> bool {
        // every token is compared so timing does not reveal which one matched
        self.0.iter().fold(false, |found, token| {
            found | bool::from(token.as_bytes().ct_eq(candidate.as_bytes()))
        })
    }
}

/// Reject requests without a valid bearer token with `401`.
pub async fn require_bearer(
    State(tokens): State<ApiTokens>,
    request: Request,
    next: Next,
) -> Response {
    if tokens.is_open() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| tokens.accepts(token.trim()));

    if authorized {
        return next.run(request).await;
    }
    tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        axum::Json(serde_json::json!({ "error": "unauthorized" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_any_configured_token() {
        let tokens = ApiTokens::new(["first".to_string(), "second".to_string()]);
        assert!(tokens.accepts("first"));
        assert!(tokens.accepts("second"));
        assert!(!tokens.accepts("third"));
        assert!(!tokens.accepts("firs"));
    }

    #[test]
    fn should_be_open_when_only_empty_tokens_configured() {
        assert!(ApiTokens::new([String::new()]).is_open());
        assert!(ApiTokens::default().is_open());
    }
}
