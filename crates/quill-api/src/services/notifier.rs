//! Failure notifications for the site owner.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use quill_core::{Config, SmtpConfig};
use std::sync::Arc;

/// Fire-and-forget notification sink. Implementations log their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, message: &str, context: &str);
}

/// Email notifier when SMTP is configured, log notifier otherwise.
pub fn create_notifier(config: &Config) -> Arc<dyn Notifier> {
    match config.smtp.as_ref().and_then(EmailNotifier::from_config) {
        Some(email) => Arc::new(email),
        None => {
            tracing::debug!("SMTP not configured, notifications go to the log");
            Arc::new(LogNotifier)
        }
    }
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, message: &str, context: &str) {
        tracing::warn!(subject = %subject, context = %context, "{}", message);
    }
}

/// Email notifier over SMTP.
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    recipients: Vec<String>,
}

impl EmailNotifier {
    pub fn from_config(smtp: &SmtpConfig) -> Option<Self> {
        let mailer = if smtp.tls {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                .map_err(|e| tracing::error!(error = %e, host = %smtp.host, "Invalid SMTP relay"))
                .ok()?
                .port(smtp.port);
            let b = match (&smtp.user, &smtp.password) {
                (Some(u), Some(p)) => b.credentials(Credentials::new(u.clone(), p.clone())),
                _ => b,
            };
            tracing::info!(host = %smtp.host, port = smtp.port, "Email notifier initialized (SMTP with STARTTLS)");
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
                .port(smtp.port);
            let b = match (&smtp.user, &smtp.password) {
                (Some(u), Some(p)) => b.credentials(Credentials::new(u.clone(), p.clone())),
                _ => b,
            };
            tracing::info!(host = %smtp.host, port = smtp.port, "Email notifier initialized (SMTP)");
            b.build()
        };

        Some(Self {
            mailer: Arc::new(mailer),
            from: smtp.from.clone(),
            recipients: smtp.recipients.clone(),
        })
    }

    async fn deliver(&self, subject: &str, body: String) -> Result<(), String> {
        let to_addrs: Vec<Mailbox> = self
            .recipients
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        if to_addrs.is_empty() {
            return Err("No valid recipient addresses".to_string());
        }
        let from_addr: Mailbox = self
            .from
            .parse()
            .map_err(|e| format!("Invalid SMTP_FROM: {}", e))?;

        let mut builder = Message::builder().from(from_addr).subject(subject);
        for mb in to_addrs {
            builder = builder.to(mb);
        }
        let email = builder
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| format!("Failed to build email: {}", e))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| format!("SMTP send failed: {}", e))?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, subject: &str, message: &str, context: &str) {
        let body = format!("{}\n\n{}", message, context);
        match self.deliver(subject, body).await {
            Ok(()) => tracing::info!(subject = %subject, "Notification email sent"),
            Err(e) => tracing::error!(subject = %subject, error = %e, "Notification email failed"),
        }
    }
}
