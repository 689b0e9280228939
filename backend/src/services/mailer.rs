use crate::config::PipelineConfig;
use anyhow::{anyhow, Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::path::Path;

/// Sends reports through an authenticated SMTP relay (Gmail by default).
pub struct EmailSender {
    sender_email: String,
    app_password: String,
    smtp_server: String,
    smtp_port: u16,
}

impl EmailSender {
    pub fn new(sender_email: &str, app_password: &str, smtp_server: &str, smtp_port: u16) -> Self {
        EmailSender {
            sender_email: sender_email.to_string(),
            app_password: app_password.to_string(),
            smtp_server: smtp_server.to_string(),
            smtp_port,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let sender = config
            .sender_email
            .as_deref()
            .ok_or_else(|| anyhow!("GMAIL_SENDER_EMAIL is not configured"))?;
        let password = config
            .app_password
            .as_deref()
            .ok_or_else(|| anyhow!("GMAIL_APP_PASSWORD is not configured"))?;
        Ok(Self::new(sender, password, &config.smtp_server, config.smtp_port))
    }

    pub fn build_message(
        &self,
        recipient_email: &str,
        subject: &str,
        body: &str,
        attachment_path: &Path,
    ) -> Result<Message> {
        let from: Mailbox = self
            .sender_email
            .parse()
            .with_context(|| format!("Invalid sender address {}", self.sender_email))?;
        let to: Mailbox = recipient_email
            .parse()
            .with_context(|| format!("Invalid recipient address {recipient_email}"))?;

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(body.to_string()));

        if attachment_path.exists() {
            let filename = attachment_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "report.pptx".to_string());
            let bytes = std::fs::read(attachment_path)?;
            let content_type = ContentType::parse("application/octet-stream")?;
            parts = parts.singlepart(Attachment::new(filename.clone()).body(bytes, content_type));
            info!("Attached file: {filename}");
        } else {
            warn!("Attachment file not found: {}", attachment_path.display());
        }

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(parts)?;
        Ok(message)
    }

    pub async fn send_report(
        &self,
        recipient_email: &str,
        subject: &str,
        body: &str,
        attachment_path: &Path,
    ) -> Result<()> {
        info!("Preparing email to {recipient_email}");
        let message = self.build_message(recipient_email, subject, body, attachment_path)?;

        info!("Connecting to {}:{}", self.smtp_server, self.smtp_port);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_server)?
            .port(self.smtp_port)
            .credentials(Credentials::new(
                self.sender_email.clone(),
                self.app_password.clone(),
            ))
            .build();

        transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;

        info!("Email sent successfully to {recipient_email}");
        Ok(())
    }

    pub async fn send_report_batch(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        attachment_path: &Path,
    ) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();
        for recipient in recipients {
            let sent = match self.send_report(recipient, subject, body, attachment_path).await {
                Ok(()) => true,
                Err(e) => {
                    error!("Error sending email to {recipient}: {e:?}");
                    false
                }
            };
            results.insert(recipient.clone(), sent);
        }
        results
    }
}
