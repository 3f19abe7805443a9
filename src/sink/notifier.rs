//! Alert email delivery

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::info;

use super::SinkError;
use crate::config::defaults::SMTP_TIMEOUT_SECS;
use crate::config::NotifyConfig;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, subject: &str, body: &str, recipient: &str)
        -> Result<(), SinkError>;
}

/// SMTP submission with STARTTLS and login credentials.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self, SinkError> {
        let from: Mailbox = config.sender().parse()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_alert(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<(), SinkError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        self.transport.send(email).await?;
        Ok(())
    }
}

/// Records alerts in the log instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_alert(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<(), SinkError> {
        info!(subject, recipient, body = %body.escape_debug(), "[Notifier] Email disabled, alert logged only");
        Ok(())
    }
}
