//! Mail sender for backup uploads.
//!
//! Uses `lettre` for message construction; the wire transport sits behind
//! [`SmtpConnector`] so the connect/send/close sequence can be observed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lettre::{
    Message,
    message::{Attachment, MultiPart, SinglePart, header::ContentType},
};
use thiserror::Error;
use tracing::{error, info};

use crate::smtp::{LettreConnector, SmtpConnector, SmtpSettings};

/// Email service errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// One or more required `MAIL_*` variables are empty.
    #[error("SMTP configuration incomplete, missing: {}", .0.join(", "))]
    IncompleteConfig(Vec<&'static str>),
    /// `MAIL_PORT` is not a port number.
    #[error("Invalid SMTP port: {0}")]
    InvalidPort(#[source] std::num::ParseIntError),
    /// The environment could not be read.
    #[error("Failed to read SMTP configuration: {0}")]
    Config(#[source] config::ConfigError),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Could not reach or negotiate with the SMTP server.
    #[error("SMTP connection failed: {0}")]
    ConnectError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
}

/// Sends an uploaded file as an email attachment.
#[async_trait]
pub trait BackupMailer: Send + Sync {
    /// Sends exactly one message with `bytes` attached as `filename`.
    async fn send_backup(
        &self,
        title: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), MailError>;
}

/// Where SMTP settings are read from on each send.
#[derive(Debug, Clone, Default)]
enum SettingsSource {
    #[default]
    Process,
    Fixed(config::Map<String, String>),
}

impl SettingsSource {
    fn load(&self) -> Result<SmtpSettings, MailError> {
        match self {
            Self::Process => SmtpSettings::from_env(),
            Self::Fixed(map) => SmtpSettings::from_environment(
                config::Environment::default().source(Some(map.clone())),
            ),
        }
    }
}

/// SMTP-backed [`BackupMailer`].
///
/// Settings are re-read on every call so credentials can rotate without a
/// restart.
#[derive(Clone)]
pub struct EmailService {
    connector: Arc<dyn SmtpConnector>,
    source: SettingsSource,
}

impl EmailService {
    /// Creates a service using lettre and the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(Arc::new(LettreConnector))
    }

    /// Creates a service with a custom connector.
    #[must_use]
    pub fn with_connector(connector: Arc<dyn SmtpConnector>) -> Self {
        Self {
            connector,
            source: SettingsSource::Process,
        }
    }

    /// Reads `MAIL_*` values from `vars` instead of the process environment.
    #[must_use]
    pub fn with_environment(mut self, vars: config::Map<String, String>) -> Self {
        self.source = SettingsSource::Fixed(vars);
        self
    }
}

impl Default for EmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackupMailer for EmailService {
    async fn send_backup(
        &self,
        title: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), MailError> {
        let settings = self.source.load().inspect_err(|e| {
            error!(error = %e, "SMTP configuration rejected");
        })?;

        info!(
            host = %settings.host,
            port = settings.port,
            encryption = settings.encryption.as_str(),
            "Connecting to SMTP server"
        );
        let mut session = self.connector.connect(&settings).await.inspect_err(|e| {
            error!(error = %e, "SMTP connection failed");
        })?;

        let result = match build_backup_message(&settings, title, filename, bytes, Local::now()) {
            Ok(message) => {
                info!(to = %settings.to, subject = %title, "Sending email");
                session.send(message).await
            }
            Err(e) => Err(e),
        };
        session.close().await;

        match &result {
            Ok(()) => info!(filename = %filename, "Email sent"),
            Err(e) => error!(error = %e, "Email send failed"),
        }
        result
    }
}

/// Renders the HTML body announcing the backup.
#[must_use]
pub fn backup_body(filename: &str, sent_at: DateTime<Local>) -> String {
    format!(
        "<h1>文件备份</h1><p>备份时间: {}</p><p>文件名: {}</p>",
        sent_at.format("%Y-%m-%d %H:%M:%S"),
        filename
    )
}

/// Builds the backup message: HTML body plus `bytes` attached as `filename`.
pub fn build_backup_message(
    settings: &SmtpSettings,
    title: &str,
    filename: &str,
    bytes: &[u8],
    sent_at: DateTime<Local>,
) -> Result<Message, MailError> {
    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| MailError::BuildError(e.to_string()))?;

    Message::builder()
        .from(
            settings
                .from
                .parse()
                .map_err(|e| MailError::InvalidAddress(format!("{e}")))?,
        )
        .to(settings
            .to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{e}")))?)
        .subject(title)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(backup_body(filename, sent_at)))
                .singlepart(Attachment::new(filename.to_string()).body(bytes.to_vec(), content_type)),
        )
        .map_err(|e| MailError::BuildError(e.to_string()))
}
