//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use mailflow_domain::error::{MailflowError, ValidationError, error_chain};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`MailflowError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(MailflowError);

impl From<MailflowError> for ApiError {
    fn from(err: MailflowError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            MailflowError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            MailflowError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            MailflowError::InvalidTransition(err) => (StatusCode::CONFLICT, err.to_string()),
            MailflowError::Conflict(err) => (StatusCode::CONFLICT, err.to_string()),
            MailflowError::Transport(_) => {
                tracing::error!(error = %error_chain(&self.0), "transport error");
                (StatusCode::BAD_GATEWAY, "email transport failed".to_string())
            }
            MailflowError::Storage(_) => {
                tracing::error!(error = %error_chain(&self.0), "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailflow_domain::error::{ConflictError, InvalidTransitionError, NotFoundError};
    use mailflow_domain::queue::QueueStatus;

    fn status_of(err: impl Into<MailflowError>) -> StatusCode {
        ApiError::from(err.into()).into_response().status()
    }

    #[test]
    fn should_map_each_error_kind_to_its_status() {
        assert_eq!(status_of(ValidationError::EmptyName), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(NotFoundError {
                entity: "Automation",
                id: "x".to_string(),
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(InvalidTransitionError {
                action: "retry",
                from: QueueStatus::Sent,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ConflictError::SystemAutomation { id: "x".to_string() }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(MailflowError::Storage(Box::new(std::io::Error::other("disk")))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
