use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Mutex;
use tracing::{error, info};

use crate::report::EmailReport;
use crate::types::Config;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, report: &EmailReport) -> Result<()>;
}

/// Submits reports over SMTP with STARTTLS and login.
///
/// The transport is built without a connection pool, so each send opens its
/// own session. The connection is torn down after the message is accepted,
/// and dropped if submission fails part way.
pub struct SmtpNotifier {
    sender: Mailbox,
    recipient: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let sender: Mailbox = cfg
            .email_sender
            .parse()
            .with_context(|| format!("Invalid EMAIL address '{}'", cfg.email_sender))?;
        let recipient: Mailbox = cfg
            .email_recipient
            .parse()
            .with_context(|| format!("Invalid TO_EMAIL address '{}'", cfg.email_recipient))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.smtp_server)
            .with_context(|| format!("Invalid SMTP server '{}'", cfg.smtp_server))?
            .port(cfg.smtp_port)
            .credentials(Credentials::new(
                cfg.email_sender.clone(),
                cfg.email_password.clone(),
            ))
            .build();

        Ok(Self {
            sender,
            recipient,
            transport,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, report: &EmailReport) -> Result<()> {
        let message = build_message(&self.sender, &self.recipient, report)?;
        self.transport
            .send(message)
            .await
            .context("SMTP submission failed")?;
        Ok(())
    }
}

pub fn build_message(sender: &Mailbox, recipient: &Mailbox, report: &EmailReport) -> Result<Message> {
    Message::builder()
        .from(sender.clone())
        .to(recipient.clone())
        .subject(report.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(report.body.clone())
        .context("Failed to build email message")
}

/// Send a report, logging the outcome. Never propagates the error.
pub async fn deliver<N: Notifier + ?Sized>(notifier: &N, report: &EmailReport) -> bool {
    match notifier.send(report).await {
        Ok(()) => {
            info!("Health summary email sent successfully");
            true
        }
        Err(e) => {
            error!("Failed to send email: {:#}", e);
            false
        }
    }
}

/// Keeps every report it is handed, for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailReport>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails after recording the attempt.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailReport> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, report: &EmailReport) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(report.clone());
        }
        if self.fail {
            anyhow::bail!("535 Authentication failed");
        }
        Ok(())
    }
}
