//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::bearer_auth};

pub mod backup;
pub mod health;

/// Creates the router; the upload route sits behind bearer authentication.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes =
        backup::routes().layer(middleware::from_fn_with_state(state.clone(), bearer_auth));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
