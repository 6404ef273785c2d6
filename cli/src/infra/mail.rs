//! Mail infrastructure: implements `Mailer` with an unauthenticated SMTP
//! relay via `lettre`.

use std::time::Duration;

use lettre::message::{Mailbox, header::ContentType};
use lettre::{Message, SmtpTransport, Transport};

use crate::application::ports::{Mailer, OutboundEmail};
use crate::domain::ReportDeliveryError;

/// Plain SMTP relay client.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    relay: String,
}

impl SmtpMailer {
    /// Create a mailer for `server:port`. No TLS, no credentials.
    #[must_use]
    pub fn new(server: &str, port: u16, timeout: Duration) -> Self {
        let transport = SmtpTransport::builder_dangerous(server)
            .port(port)
            .timeout(Some(timeout))
            .build();
        Self {
            transport,
            relay: format!("{server}:{port}"),
        }
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), ReportDeliveryError> {
        let message = build_message(email)?;
        let transport = self.transport.clone();
        let relay = self.relay.clone();
        tracing::debug!(%relay, recipients = email.to.len(), "sending report email");
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| ReportDeliveryError::Send {
                server: self.relay.clone(),
                reason: format!("spawn_blocking panicked: {e}"),
            })?
            .map_err(|e| ReportDeliveryError::Send {
                server: relay,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn relay(&self) -> String {
        self.relay.clone()
    }
}

/// Build the HTML message for an outbound email.
///
/// # Errors
///
/// Returns an error if an address does not parse or the message cannot be
/// assembled.
pub fn build_message(email: &OutboundEmail) -> Result<Message, ReportDeliveryError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_HTML);
    for to in &email.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    builder
        .body(email.html.clone())
        .map_err(|e| ReportDeliveryError::Build(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ReportDeliveryError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| ReportDeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
