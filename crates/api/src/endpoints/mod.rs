//! API endpoints.

mod admin;
mod auth;
mod programs;
mod registration;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/programs", programs::router())
        .nest("/registration", registration::router())
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
}
