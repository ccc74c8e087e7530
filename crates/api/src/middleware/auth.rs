//! Shared-secret bearer authentication for the upload route.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use mailbackup_shared::AppError;
use tracing::{error, warn};

use crate::{
    AppState,
    response::{self, ApiFailure},
};

/// Returns `true` when `header` is exactly `Bearer <token>`.
///
/// No scheme case-folding and no whitespace trimming.
pub fn bearer_matches(header: Option<&str>, token: &str) -> bool {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == token)
}

/// Authentication middleware comparing the Authorization header with `TOKEN`.
///
/// This middleware:
/// 1. Answers 500 when no token is configured
/// 2. Answers 401 unless the header equals `Bearer <TOKEN>`
/// 3. Otherwise passes the request through untouched
pub async fn bearer_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(token) = state.token.as_deref() else {
        error!("TOKEN is not configured");
        return response::failure(
            state.response_format,
            &ApiFailure::new(
                "服务器配置错误",
                AppError::Configuration("authentication token not configured".into()),
            ),
        );
    };

    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if !bearer_matches(auth_header, token) {
        warn!(
            header_present = auth_header.is_some(),
            "Bearer token rejected"
        );
        return response::failure(
            state.response_format,
            &ApiFailure::new(
                "认证失败",
                AppError::Unauthorized("invalid bearer token".into()),
            ),
        );
    }

    next.run(request).await
}
