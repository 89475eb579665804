//! Email notifier over authenticated SMTP

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{Config, SmtpConfig};
use crate::notifier::{compose_alert, Alert, Notifier};
use crate::SitewatchError;

/// Submits a finished message to a mail server
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: Message) -> crate::Result<()>;
}

/// Production sender: STARTTLS submission with login credentials
pub struct SmtpMailSender {
    server: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailSender {
    pub fn new(smtp: &SmtpConfig) -> crate::Result<Self> {
        let (Some(username), Some(password)) = (&smtp.username, &smtp.password) else {
            return Err(SitewatchError::Config(
                "SMTP credentials not configured".to_string(),
            ));
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.server)
            .map_err(|e| {
                SitewatchError::Config(format!("Invalid SMTP server {}: {}", smtp.server, e))
            })?
            .port(smtp.port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .build();

        tracing::debug!("Created SmtpMailSender for {}:{}", smtp.server, smtp.port);

        Ok(Self {
            server: smtp.server.clone(),
            transport,
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, message: Message) -> crate::Result<()> {
        self.transport.send(message).await.map_err(|e| {
            SitewatchError::Notifier(format!("SMTP submission to {} failed: {}", self.server, e))
        })?;
        Ok(())
    }
}

/// Sends alerts by email from the SMTP account to the configured recipient
pub struct EmailNotifier {
    from: Mailbox,
    to: Mailbox,
    sender: Arc<dyn MailSender>,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("from", &self.from.to_string())
            .field("to", &self.to.to_string())
            .finish()
    }
}

impl EmailNotifier {
    pub fn new(config: &Config, sender: Arc<dyn MailSender>) -> crate::Result<Self> {
        let from = parse_mailbox("SMTP username", config.smtp.username.as_deref())?;
        let to = parse_mailbox("alert email", config.alert_email.as_deref())?;

        tracing::debug!("Created EmailNotifier sending to {}", to);

        Ok(Self { from, to, sender })
    }

    /// Build the email for an alert
    pub fn build_message(&self, alert: &Alert) -> crate::Result<Message> {
        let rendered = compose_alert(alert);
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(rendered.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(rendered.body)
            .map_err(|e| SitewatchError::Notifier(format!("Failed to build alert email: {}", e)))
    }
}

fn parse_mailbox(what: &str, value: Option<&str>) -> crate::Result<Mailbox> {
    let value = value.ok_or_else(|| SitewatchError::Config(format!("{} not configured", what)))?;
    value
        .parse()
        .map_err(|e| SitewatchError::Config(format!("Invalid {} {:?}: {}", what, value, e)))
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn type_name(&self) -> &str {
        "email"
    }

    async fn notify(&self, alert: &Alert) -> crate::Result<()> {
        let message = self.build_message(alert)?;
        tracing::debug!(
            "Sending alert email for {} to {}",
            alert.endpoint_id,
            self.to
        );
        self.sender.send(message).await
    }
}
