//! SMTP delivery through a pooled [`AsyncSmtpTransport`].

use std::fmt;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use mailflow_app::ports::EmailTransport;
use mailflow_domain::error::TransportError;
use mailflow_domain::queue::OutgoingEmail;

use crate::error::SmtpError;

/// Connection settings for the SMTP relay.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: Option<String>,
    /// Upgrade the connection with STARTTLS. Without it the connection is
    /// plain text, which is only meant for local relays.
    pub starttls: bool,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("starttls", &self.starttls)
            .finish()
    }
}

/// Sends queue items through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Configure the relay and parse the sender address.
    ///
    /// No connection is opened until the first send.
    ///
    /// # Errors
    ///
    /// Returns [`SmtpError`] when the sender address is invalid or the relay
    /// cannot be configured for `host`.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let address: Address = config
            .from_email
            .parse()
            .map_err(|source| SmtpError::InvalidSender {
                address: config.from_email.clone(),
                source,
            })?;
        let from = Mailbox::new(config.from_name.clone(), address);

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(
                |source| SmtpError::Relay {
                    host: config.host.clone(),
                    source,
                },
            )?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);
        if let Some(username) = &config.username {
            let password = config.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        tracing::debug!(
            host = %config.host,
            port = config.port,
            starttls = config.starttls,
            "smtp relay configured"
        );
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, TransportError> {
        let address: Address = email
            .to
            .parse()
            .map_err(|_| TransportError::InvalidAddress(email.to.clone()))?;
        let builder = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(email.to_name.clone(), address))
            .subject(&email.subject);

        let message = match &email.html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                html.clone(),
            )),
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(email.text.clone()),
        };
        message.map_err(|err| TransportError::Message(Box::new(err)))
    }
}

impl EmailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let message = self.build_message(email)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|err| TransportError::Delivery(Box::new(err)))?;
        tracing::debug!(to = %email.to, code = %response.code(), "email accepted by relay");
        Ok(())
    }
}
