//! Session endpoints.
//!
//! The session token travels in an HttpOnly cookie. Clients that cannot keep
//! cookies may send the same token as `Authorization: Bearer`.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar, WithRejection,
    cookie::{Cookie, SameSite},
};
use markaz_common::{AppError, AppResult};
use markaz_db::entities::user::{self, UserRole};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthClaims, MaybeAuthClaims},
    middleware::AppState,
    response::ApiResponse,
};

/// Login request.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Signed-in account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl From<user::Model> for SessionUser {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
        }
    }
}

/// Logout response.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub ok: bool,
}

/// Sign in and set the session cookie.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<(CookieJar, ApiResponse<SessionUser>)> {
    let (user, token) = state
        .identity_service
        .login(&req.email, &req.password)
        .await?;

    let cookie = Cookie::build((state.cookie.name.clone(), token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie.secure)
        .path("/")
        .build();

    Ok((jar.add(cookie), ApiResponse::ok(user.into())))
}

/// Clear the session cookie.
async fn logout(
    State(state): State<AppState>,
    MaybeAuthClaims(claims): MaybeAuthClaims,
    jar: CookieJar,
) -> (CookieJar, ApiResponse<LogoutResponse>) {
    if let Some(claims) = claims {
        tracing::info!(user_id = %claims.sub, "User signed out");
    }

    let jar = jar.remove(Cookie::build(state.cookie.name.clone()).path("/"));
    (jar, ApiResponse::ok(LogoutResponse { ok: true }))
}

/// Current account.
async fn me(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> AppResult<ApiResponse<SessionUser>> {
    let user = state.identity_service.me(&claims).await?;
    Ok(ApiResponse::ok(user.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
