//! # mailflow-adapter-smtp-lettre
//!
//! Implements [`EmailTransport`](mailflow_app::ports::EmailTransport) on top
//! of [`lettre`]'s async SMTP transport.
//!
//! [`Mailer`] is what the binary wires in: either a real [`SmtpMailer`] or a
//! [`LoggingMailer`] that only logs, used when SMTP is disabled.

mod error;
mod logging;
mod smtp;

pub use error::SmtpError;
pub use logging::LoggingMailer;
pub use smtp::{SmtpConfig, SmtpMailer};

use mailflow_app::ports::EmailTransport;
use mailflow_domain::error::TransportError;
use mailflow_domain::queue::OutgoingEmail;

/// The transport selected at startup.
pub enum Mailer {
    Smtp(SmtpMailer),
    Logging(LoggingMailer),
}

impl EmailTransport for Mailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        match self {
            Self::Smtp(mailer) => mailer.send(email).await,
            Self::Logging(mailer) => mailer.send(email).await,
        }
    }
}
