//! Backup upload route.
//!
//! `POST /api/backup` takes a `multipart/form-data` body with an optional
//! `title` field and a required `file` part, and mails the file as an
//! attachment. The bearer check happens in [`crate::middleware::bearer_auth`]
//! before this handler runs.

use axum::{
    Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    response::Response,
    routing::post,
};
use chrono::{Local, NaiveDate};
use mailbackup_shared::AppError;
use tracing::{error, info};

use crate::{
    AppState,
    response::{self, ApiFailure, BackupReceipt},
};

/// Upper bound for the whole multipart body: 5 MiB.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Form field carrying the subject line.
const TITLE_FIELD: &str = "title";
/// Form field carrying the file.
const FILE_FIELD: &str = "file";

/// Creates the backup upload routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/backup", post(upload_backup))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// A parsed upload. Lives only for the duration of the request.
#[derive(Debug)]
pub struct UploadRequest {
    /// Raw `title` field, untrimmed.
    pub title: Option<String>,
    /// Filename the client sent with the `file` part.
    pub filename: String,
    /// File content.
    pub bytes: Bytes,
}

impl UploadRequest {
    /// Size of the uploaded file in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Subject used when the client sends no usable title.
#[must_use]
pub fn default_title(today: NaiveDate) -> String {
    format!("[数据备份][未命名数据]{}备份", today.format("%Y-%m-%d"))
}

/// Trims `raw`, falling back to [`default_title`] when nothing is left.
#[must_use]
pub fn resolve_title(raw: Option<&str>, today: NaiveDate) -> String {
    match raw.map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => default_title(today),
    }
}

/// POST `/api/backup`
async fn upload_backup(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match handle_upload(&state, multipart).await {
        Ok(receipt) => response::success(state.response_format, receipt),
        Err(failure) => response::failure(state.response_format, &failure),
    }
}

async fn handle_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<BackupReceipt, ApiFailure> {
    let multipart = multipart.map_err(|e| {
        error!(error = %e.body_text(), "Request is not a usable multipart form");
        malformed_form(e.body_text())
    })?;

    let upload = read_upload(multipart).await?;
    let title = resolve_title(upload.title.as_deref(), Local::now().date_naive());

    info!(
        filename = %upload.filename,
        title = %title,
        size = upload.size(),
        "Preparing backup email"
    );
    state
        .mailer
        .send_backup(&title, &upload.filename, &upload.bytes)
        .await
        .map_err(|e| {
            error!(error = %e, filename = %upload.filename, "Backup email failed");
            ApiFailure::new("邮件发送失败", AppError::from(e))
        })?;
    info!(filename = %upload.filename, "Backup email sent");

    Ok(BackupReceipt {
        size: upload.size(),
        filename: upload.filename,
        title,
        timestamp: Local::now().to_rfc3339(),
    })
}

/// Walks the form, keeping the first `title` and the first `file` part.
async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, ApiFailure> {
    let mut title = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!(error = %e.body_text(), "Multipart parse error");
        malformed_form(e.body_text())
    })? {
        let name = field.name().map(ToOwned::to_owned);
        match name.as_deref() {
            Some(TITLE_FIELD) if title.is_none() => {
                let raw = field.bytes().await.map_err(|e| {
                    error!(error = %e.body_text(), "Failed to read title field");
                    malformed_form(e.body_text())
                })?;
                title = Some(String::from_utf8_lossy(&raw).into_owned());
            }
            Some(FILE_FIELD) if file.is_none() => {
                let Some(filename) = field
                    .file_name()
                    .filter(|f| !f.is_empty())
                    .map(ToOwned::to_owned)
                else {
                    error!("Form field `file` carries no file");
                    return Err(missing_file("form field `file` is not a file upload"));
                };
                let bytes = field.bytes().await.map_err(|e: MultipartError| {
                    error!(error = %e.body_text(), filename = %filename, "File read error");
                    ApiFailure::new("文件读取失败", AppError::InvalidInput(e.body_text()))
                })?;
                file = Some((filename, bytes));
            }
            _ => {}
        }
    }

    let Some((filename, bytes)) = file else {
        error!("Upload has no `file` part");
        return Err(missing_file("no file part named `file` in form"));
    };

    Ok(UploadRequest {
        title,
        filename,
        bytes,
    })
}

fn malformed_form(detail: String) -> ApiFailure {
    ApiFailure::new("表单解析失败", AppError::InvalidInput(detail))
}

fn missing_file(detail: &str) -> ApiFailure {
    ApiFailure::new("文件上传失败", AppError::InvalidInput(detail.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn test_default_title_embeds_date() {
        assert_eq!(default_title(day()), "[数据备份][未命名数据]2024-07-01备份");
    }

    #[test]
    fn test_resolve_title_trims_input() {
        assert_eq!(resolve_title(Some("  nightly dump \n"), day()), "nightly dump");
    }

    #[test]
    fn test_resolve_title_falls_back_when_blank() {
        assert_eq!(resolve_title(Some("   "), day()), default_title(day()));
        assert_eq!(resolve_title(Some(""), day()), default_title(day()));
        assert_eq!(resolve_title(None, day()), default_title(day()));
    }

    #[test]
    fn test_upload_size_counts_bytes() {
        let upload = UploadRequest {
            title: None,
            filename: "a.txt".into(),
            bytes: Bytes::from_static(b"hello"),
        };
        assert_eq!(upload.size(), 5);
    }
}
