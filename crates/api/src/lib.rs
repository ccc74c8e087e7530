//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The authenticated backup upload route
//! - Bearer token middleware
//! - Health check route
//! - Response envelope types

pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use mailbackup_shared::{AppConfig, BackupMailer, EmailService, ResponseFormat};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Expected bearer secret; `None` when `TOKEN` was not configured.
    pub token: Option<Arc<str>>,
    /// How upload responses are rendered.
    pub response_format: ResponseFormat,
    /// Sends uploaded files by email.
    pub mailer: Arc<dyn BackupMailer>,
}

impl AppState {
    /// Builds the production state from loaded configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            token: config.token.as_deref().map(Arc::from),
            response_format: config.response_format,
            mailer: Arc::new(EmailService::new()),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
