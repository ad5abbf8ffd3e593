//! Outbound email.

use std::sync::Arc;

use async_trait::async_trait;
use hollow_common::config::EmailConfig;
use hollow_common::{AppError, AppResult};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::services::dispatch::{EmailKind, EmailPayload};

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body. Carries the code or nonce.
    pub body: String,
}

/// Render the subject and body of an email task.
#[must_use]
pub fn render(payload: &EmailPayload) -> RenderedEmail {
    let (subject, body) = match &payload.kind {
        EmailKind::Validation { code } => (
            "Your validation code".to_string(),
            format!("Your validation code is {code}. It expires in 12 hours."),
        ),
        EmailKind::NonceRecovery { nonce } => (
            "Recover your account".to_string(),
            format!("Use this recovery nonce to restore access to your account:\n\n{nonce}"),
        ),
        EmailKind::Unregister { code } => (
            "Confirm account removal".to_string(),
            format!(
                "Your account removal code is {code}. Ignore this email if you did not ask to \
                 remove your account."
            ),
        ),
    };

    RenderedEmail {
        to: payload.recipient.clone(),
        subject,
        body,
    }
}

/// Mail transport.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Send one email.
    async fn send(&self, email: &RenderedEmail) -> AppResult<()>;
}

/// Sends mail through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailSender {
    /// Build a sender for the given relay.
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from: impl Into<String>,
    ) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| AppError::Config(format!("Invalid SMTP relay {host}: {e}")))?
            .port(port);
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, email: &RenderedEmail) -> AppResult<()> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::Config(format!("Invalid sender address: {e}")))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| AppError::ExternalService(format!("Invalid recipient: {e}")))?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalService(format!("SMTP send failed: {e}")))?;

        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Logs emails instead of sending them.
///
/// Bodies carry validation codes and recovery nonces, so they only appear
/// at debug level.
#[derive(Clone, Default)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, email: &RenderedEmail) -> AppResult<()> {
        info!(
            to = %email.to,
            subject = %email.subject,
            body_len = email.body.len(),
            "SMTP not configured, logging email instead"
        );
        debug!(to = %email.to, body = %email.body, "Unsent email body");
        Ok(())
    }
}

/// Email service.
#[derive(Clone)]
pub struct EmailService {
    sender: Arc<dyn MailSender>,
}

impl EmailService {
    /// Create a new email service.
    #[must_use]
    pub fn new(sender: Arc<dyn MailSender>) -> Self {
        Self { sender }
    }

    /// Pick the sender from configuration: SMTP when a relay host is set,
    /// logging otherwise.
    pub fn from_config(config: &EmailConfig) -> AppResult<Self> {
        let sender: Arc<dyn MailSender> = match &config.smtp_host {
            Some(host) => {
                let credentials = config
                    .smtp_username
                    .clone()
                    .zip(config.smtp_password.clone());
                Arc::new(SmtpMailSender::new(
                    host,
                    config.smtp_port,
                    credentials,
                    config.from_address.clone(),
                )?)
            }
            None => Arc::new(LogMailSender),
        };
        Ok(Self::new(sender))
    }

    /// Handle an email task.
    pub async fn deliver(&self, payload: &EmailPayload) -> AppResult<()> {
        self.sender.send(&render(payload)).await
    }
}
