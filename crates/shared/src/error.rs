//! Application-wide error types.

use thiserror::Error;

use crate::email::MailError;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Server-side configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// The caller sent a request we cannot use.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External service error (SMTP).
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::InvalidInput(_) => 400,
            Self::Configuration(_) | Self::ExternalService(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the bare detail text, without the category prefix.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Configuration(d)
            | Self::Unauthorized(d)
            | Self::InvalidInput(d)
            | Self::ExternalService(d)
            | Self::Internal(d) => d,
        }
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::IncompleteConfig(_) | MailError::InvalidPort(_) | MailError::Config(_) => {
                Self::Configuration(err.to_string())
            }
            MailError::InvalidAddress(_) | MailError::BuildError(_) => {
                Self::Internal(err.to_string())
            }
            MailError::ConnectError(_) | MailError::SendError(_) => {
                Self::ExternalService(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AppError::Configuration(String::new()).status_code(), 500);
        assert_eq!(AppError::Unauthorized(String::new()).status_code(), 401);
        assert_eq!(AppError::InvalidInput(String::new()).status_code(), 400);
        assert_eq!(AppError::ExternalService(String::new()).status_code(), 500);
        assert_eq!(AppError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::Configuration(String::new()).error_code(),
            "CONFIGURATION_ERROR"
        );
        assert_eq!(
            AppError::Unauthorized(String::new()).error_code(),
            "UNAUTHORIZED"
        );
        assert_eq!(
            AppError::InvalidInput(String::new()).error_code(),
            "INVALID_INPUT"
        );
        assert_eq!(
            AppError::ExternalService(String::new()).error_code(),
            "EXTERNAL_SERVICE_ERROR"
        );
        assert_eq!(
            AppError::Internal(String::new()).error_code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::Configuration("msg".into()).to_string(),
            "Configuration error: msg"
        );
        assert_eq!(
            AppError::Unauthorized("msg".into()).to_string(),
            "Authentication failed: msg"
        );
        assert_eq!(
            AppError::InvalidInput("msg".into()).to_string(),
            "Invalid input: msg"
        );
        assert_eq!(
            AppError::ExternalService("msg".into()).to_string(),
            "External service error: msg"
        );
    }

    #[test]
    fn test_detail_strips_prefix() {
        assert_eq!(AppError::InvalidInput("no file".into()).detail(), "no file");
    }

    #[test]
    fn test_mail_errors_map_to_categories() {
        let incomplete: AppError = MailError::IncompleteConfig(vec!["MAIL_HOST"]).into();
        assert_eq!(incomplete.status_code(), 500);
        assert_eq!(incomplete.error_code(), "CONFIGURATION_ERROR");

        let send: AppError = MailError::SendError("boom".into()).into();
        assert_eq!(send.error_code(), "EXTERNAL_SERVICE_ERROR");
        assert_eq!(send.detail(), "Failed to send email: boom");

        let connect: AppError = MailError::ConnectError("refused".into()).into();
        assert_eq!(connect.detail(), "SMTP connection failed: refused");
    }
}
