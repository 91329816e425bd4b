//! Dry-run transport that logs instead of sending.

use mailflow_app::ports::EmailTransport;
use mailflow_domain::error::TransportError;
use mailflow_domain::queue::OutgoingEmail;

/// Accepts every message and writes a log line for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMailer;

impl EmailTransport for LoggingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            html = email.html.is_some(),
            "smtp disabled, email logged instead of sent"
        );
        tracing::debug!(body = %email.text, "logged email body");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_accept_every_message() {
        let email = OutgoingEmail {
            to: "ada@example.com".to_string(),
            to_name: None,
            subject: "Hi".to_string(),
            text: "Hello".to_string(),
            html: None,
        };
        assert!(LoggingMailer.send(&email).await.is_ok());
    }
}
