//! Errors raised while setting up the SMTP transport.

/// Failure to build an [`SmtpMailer`](crate::SmtpMailer).
#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
    /// The configured sender address does not parse.
    #[error("invalid sender address {address:?}")]
    InvalidSender {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    /// The relay could not be configured (e.g. TLS parameters for the host).
    #[error("failed to configure SMTP relay {host:?}")]
    Relay {
        host: String,
        #[source]
        source: lettre::transport::smtp::Error,
    },
}
