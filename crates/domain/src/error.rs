//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`MailflowError`] via `#[from]` (storage and transport failures are boxed
//! so the domain stays free of adapter types).

use crate::queue::QueueStatus;

/// Top-level error for every use-case in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum MailflowError {
    /// A domain invariant was violated by the caller's input.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A queue item cannot move from its current status to the requested one.
    #[error("invalid transition")]
    InvalidTransition(#[from] InvalidTransitionError),

    /// The operation conflicts with the current state of the record.
    #[error("conflict")]
    Conflict(#[from] ConflictError),

    /// The email transport refused or failed to deliver a message.
    #[error("transport error")]
    Transport(#[from] TransportError),

    /// The persistence layer failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invariant violations detected by `validate()` methods.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("subject must not be empty")]
    EmptySubject,
    #[error("body must not be empty")]
    EmptyBody,
    #[error("an automation needs a template or a sequence")]
    MissingContent,
    #[error("a sequence needs at least one step")]
    NoSteps,
    #[error("step {order} has an empty subject")]
    EmptyStepSubject { order: u32 },
    #[error("step {order} has an empty body")]
    EmptyStepBody { order: u32 },
    #[error("step order {order} is used more than once")]
    DuplicateStepOrder { order: u32 },
    #[error("a call-to-action label needs a URL")]
    CtaWithoutUrl,
    #[error("a delay of {days} days and {hours} hours exceeds {max_days} days")]
    DelayTooLong { days: u32, hours: u32, max_days: u32 },
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),
    #[error("event payload has no recipient email")]
    MissingRecipient,
    #[error("invalid identifier: {0:?}")]
    InvalidId(String),
    #[error("unknown status {0:?}")]
    InvalidStatus(String),
    #[error("unknown event type {0:?}")]
    UnknownEventType(String),
    #[error("automation {id} is not accepting enrollments")]
    AutomationInactive { id: String },
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A queue item status change that the lifecycle does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} an item that is {from}")]
pub struct InvalidTransitionError {
    pub action: &'static str,
    pub from: QueueStatus,
}

/// Operations rejected because of the record's current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("system automation {id} cannot be deleted")]
    SystemAutomation { id: String },
    #[error("recipient {email} is already enrolled in automation {automation_id}")]
    AlreadyEnrolled {
        automation_id: String,
        email: String,
    },
}

/// Failure reported by an email transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The recipient or sender address could not be parsed.
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    /// The message could not be assembled.
    #[error("failed to build message")]
    Message(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The remote server rejected the message or the connection failed.
    #[error("delivery failed")]
    Delivery(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The send did not complete within the configured timeout.
    #[error("send timed out after {0}s")]
    Timeout(u64),
}

/// Render an error and its whole `source()` chain as `outer: inner: root`.
#[must_use]
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_via_from() {
        let err: MailflowError = ValidationError::EmptyName.into();
        assert!(matches!(
            err,
            MailflowError::Validation(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Automation",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Automation abc not found");
    }

    #[test]
    fn should_display_invalid_transition_with_action_and_status() {
        let err = InvalidTransitionError {
            action: "retry",
            from: QueueStatus::Sent,
        };
        assert_eq!(err.to_string(), "cannot retry an item that is sent");
    }

    #[test]
    fn should_join_source_chain_when_rendering_error_chain() {
        let io = std::io::Error::other("connection reset");
        let err = TransportError::Delivery(Box::new(io));
        assert_eq!(error_chain(&err), "delivery failed: connection reset");
    }

    #[test]
    fn should_render_single_error_without_separator() {
        let err = TransportError::Timeout(30);
        assert_eq!(error_chain(&err), "send timed out after 30s");
    }
}
