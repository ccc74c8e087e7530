//! Shared configuration, errors, and the SMTP mail sender for mailbackup.
//!
//! This crate provides:
//! - Application configuration (`AppConfig`)
//! - Application-wide error types
//! - SMTP settings read from `MAIL_*` environment variables
//! - The backup mail sender (`EmailService`)

pub mod config;
pub mod email;
pub mod error;
pub mod smtp;


pub use self::config::{AppConfig, ResponseFormat, ServerConfig};
pub use email::{BackupMailer, EmailService, MailError};
pub use error::{AppError, AppResult};
pub use smtp::{Encryption, LettreConnector, SmtpConnector, SmtpSession, SmtpSettings};
