//! Notification email sent to the lead after a successful submission.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use leadrelay_core::{Config, Enquiry};

/// Receives the finalized enquiry. Callers do not wait for delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, enquiry: &Enquiry, text: &str) -> Result<(), String>;
}

/// Fire-and-forget notification; failures are logged only.
pub fn spawn_notification(notifier: Arc<dyn Notifier>, enquiry: Enquiry, text: String) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&enquiry, &text).await {
            tracing::error!(lead_id = %enquiry.lead_id, error = %e, "Notification failed");
        }
    });
}

fn body_text(enquiry: &Enquiry, text: &str) -> String {
    format!(
        "Hi {},\n\nThanks for getting in touch. We received your enquiry:\n\n{}\n\nReference: {}\n",
        enquiry.first_name, text, enquiry.lead_id
    )
}

/// SMTP notifier
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    subject: String,
}

impl EmailService {
    /// Create email service from config. Returns `None` if disabled.
    pub fn from_config(config: &Config) -> anyhow::Result<Option<Self>> {
        if !config.notify_enabled() {
            tracing::debug!("Notification email disabled (NOTIFY_ENABLED=false)");
            return Ok(None);
        }
        let host = config
            .smtp_host()
            .ok_or_else(|| anyhow::anyhow!("SMTP_HOST not configured"))?;
        let port = config.smtp_port().unwrap_or(587);
        let from: Mailbox = config
            .notify_from()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid NOTIFY_FROM: {}", e))?;

        let builder = if config.smtp_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(port);
        let builder = match (config.smtp_user(), config.smtp_password()) {
            (Some(u), Some(p)) => builder.credentials(Credentials::new(u.to_string(), p.to_string())),
            _ => builder,
        };

        tracing::info!(
            host = %host,
            port = port,
            tls = config.smtp_tls(),
            "Email service initialized"
        );

        Ok(Some(Self {
            mailer: Arc::new(builder.build()),
            from,
            subject: config.notify_subject().to_string(),
        }))
    }

    fn build_message(&self, enquiry: &Enquiry, text: &str) -> Result<Message, String> {
        let to: Mailbox = enquiry
            .email
            .parse()
            .map_err(|e| format!("Invalid recipient: {}", e))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(body_text(enquiry, text))
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn notify(&self, enquiry: &Enquiry, text: &str) -> Result<(), String> {
        let message = self.build_message(enquiry, text)?;
        self.mailer.send(message).await.map_err(|e| e.to_string())?;
        tracing::info!(lead_id = %enquiry.lead_id, "Notification email sent");
        Ok(())
    }
}
