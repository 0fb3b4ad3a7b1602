//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use markaz_common::AppError;
use markaz_core::Claims;

/// Claims of the signed-in user, set by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthClaims(pub Claims);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthClaims)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional session claims.
#[derive(Debug, Clone)]
pub struct MaybeAuthClaims(pub Option<Claims>);

impl<S> FromRequestParts<S> for MaybeAuthClaims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Claims>().cloned()))
    }
}
