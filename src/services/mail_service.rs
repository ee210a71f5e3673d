use crate::config::Config;
use crate::error::{AppError, AppResult};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct MailService {
    from: String,
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailDelivery {
    Sent,
    /// No SMTP host configured; the message was only logged.
    Skipped,
}

impl MailService {
    pub fn new(config: &Config) -> AppResult<Self> {
        let Some(host) = &config.smtp_host else {
            return Ok(Self {
                from: config.mail_from.clone(),
                transport: None,
            });
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::Mail(format!("failed to create SMTP relay: {}", e)))?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.reminder_timeout_secs)));

        if let (Some(user), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            from: config.mail_from.clone(),
            transport: Some(Arc::new(builder.build())),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<MailDelivery> {
        let Some(transport) = &self.transport else {
            tracing::warn!("SMTP not configured. Mail to {} not sent: {}", to, subject);
            return Ok(MailDelivery::Skipped);
        };

        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| AppError::Mail(format!("invalid from address: {}", e)))?;
        let recipient: Mailbox = to
            .trim()
            .parse()
            .map_err(|e| AppError::Mail(format!("invalid recipient {}: {}", to, e)))?;

        let message = Message::builder()
            .from(from)
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Mail(format!("failed to build message: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(MailDelivery::Sent)
    }
}
