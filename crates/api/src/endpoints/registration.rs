//! Registration endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use markaz_common::{AppError, AppResult};
use markaz_core::{RegistrationForm, RegistrationOutcome, RegistrationStatus};
use serde::Deserialize;

use crate::{middleware::AppState, response::ApiResponse};

/// Query for the status lookup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub enrollment_id: Option<String>,
}

/// Submit a registration.
async fn register(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<RegistrationForm>, AppError>,
) -> AppResult<ApiResponse<RegistrationOutcome>> {
    let outcome = state.registration_service.register(form).await?;
    Ok(ApiResponse::created(outcome))
}

/// Look up a registration by enrollment id.
async fn status(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<StatusQuery>, AppError>,
) -> AppResult<ApiResponse<RegistrationStatus>> {
    let enrollment_id = query
        .enrollment_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::MissingFields(vec!["enrollmentId".to_string()]))?;

    let status = state.registration_service.status(enrollment_id).await?;
    Ok(ApiResponse::ok(status))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/status", get(status))
}
