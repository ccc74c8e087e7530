//! Response envelope shared by the upload route and its middleware.
//!
//! The JSON variant wraps everything in `{code, msg, data}`; the plain variant
//! answers with bare text. Which one is used comes from [`ResponseFormat`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailbackup_shared::{AppError, ResponseFormat};
use serde::Serialize;
use serde_json::json;

/// Success phrase in the JSON envelope.
pub const SUCCESS_MSG: &str = "备份成功";

/// Plain-text success body.
pub const SUCCESS_TEXT: &str = "备份成功!";

/// `{code, msg, data}` envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Mirrors the HTTP status.
    pub code: u16,
    /// Short human-readable summary.
    pub msg: String,
    /// Payload or error detail.
    pub data: T,
}

/// Data returned after a successful backup.
#[derive(Debug, Clone, Serialize)]
pub struct BackupReceipt {
    /// Original upload filename.
    pub filename: String,
    /// Subject used for the email.
    pub title: String,
    /// Attachment size in bytes.
    pub size: u64,
    /// Completion time, RFC3339.
    pub timestamp: String,
}

/// A failed request: a caller-facing summary plus the categorized cause.
#[derive(Debug)]
pub struct ApiFailure {
    /// Summary shown as `msg`.
    pub msg: &'static str,
    /// Cause; decides the status and supplies `data.error`.
    pub error: AppError,
}

impl ApiFailure {
    /// Creates a failure.
    #[must_use]
    pub const fn new(msg: &'static str, error: AppError) -> Self {
        Self { msg, error }
    }

    /// HTTP status for this failure.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Renders a successful backup.
pub fn success(format: ResponseFormat, receipt: BackupReceipt) -> Response {
    match format {
        ResponseFormat::Json => (
            StatusCode::OK,
            Json(ApiResponse {
                code: StatusCode::OK.as_u16(),
                msg: SUCCESS_MSG.to_string(),
                data: receipt,
            }),
        )
            .into_response(),
        ResponseFormat::Plain => (StatusCode::OK, SUCCESS_TEXT).into_response(),
    }
}

/// Renders a failure.
pub fn failure(format: ResponseFormat, failure: &ApiFailure) -> Response {
    let status = failure.status();
    match format {
        ResponseFormat::Json => (
            status,
            Json(ApiResponse {
                code: status.as_u16(),
                msg: failure.msg.to_string(),
                data: json!({ "error": failure.error.detail() }),
            }),
        )
            .into_response(),
        ResponseFormat::Plain => (
            status,
            format!("{}: {}", failure.msg, failure.error.detail()),
        )
            .into_response(),
    }
}
