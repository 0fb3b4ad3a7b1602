//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use markaz_common::{AppError, Config};
use markaz_core::{
    Claims, IdentityService, PaymentReviewService, ProgramService, RegistrationService,
    policy_from_config,
};
use markaz_db::repositories::{ProgramRepository, UserRepository};
use sea_orm::DatabaseConnection;

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub identity_service: IdentityService,
    pub program_service: ProgramService,
    pub registration_service: RegistrationService,
    pub payment_review_service: PaymentReviewService,
    pub cookie: CookieSettings,
}

impl AppState {
    /// Wire up all services on top of a database connection.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let program_service = ProgramService::new(ProgramRepository::new(db.clone()));
        let identity_service = IdentityService::new(UserRepository::new(db.clone()), &config.auth);
        let registration_service = RegistrationService::new(
            db.clone(),
            program_service.clone(),
            policy_from_config(&config.registration),
            &config.registration,
        );
        let payment_review_service = PaymentReviewService::new(db);

        Self {
            identity_service,
            program_service,
            registration_service,
            payment_review_service,
            cookie: CookieSettings {
                name: config.auth.cookie_name.clone(),
                secure: config.auth.secure_cookie,
            },
        }
    }
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Authentication middleware.
///
/// Verifies the session token from the cookie, or from an
/// `Authorization: Bearer` header, and stores its [`Claims`] in the request
/// extensions. Requests without a valid token pass through anonymously.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = jar
        .get(&state.cookie.name)
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(&req).map(str::to_string));

    if let Some(token) = token {
        match state.identity_service.verify_token(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(_) => tracing::debug!("Ignoring invalid session token"),
        }
    }

    next.run(req).await
}

/// Gate for the admin router: 401 without a session, 403 for non-admins.
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<Claims>() {
        None => AppError::Unauthorized.into_response(),
        Some(claims) if !claims.is_admin() => {
            AppError::Forbidden("administrator access required".to_string()).into_response()
        }
        Some(_) => next.run(req).await,
    }
}
