//! Email transport port — hands rendered messages to a mail server.

use std::future::Future;
use std::sync::Arc;

use mailflow_domain::error::TransportError;
use mailflow_domain::queue::OutgoingEmail;

/// Delivers one rendered email.
pub trait EmailTransport {
    /// Send `email`, resolving once the remote side accepted or refused it.
    fn send(
        &self,
        email: &OutgoingEmail,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: EmailTransport + Send + Sync> EmailTransport for Arc<T> {
    fn send(
        &self,
        email: &OutgoingEmail,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        (**self).send(email)
    }
}
