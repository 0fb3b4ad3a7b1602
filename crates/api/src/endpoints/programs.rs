//! Public program catalog.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use chrono::{DateTime, FixedOffset};
use markaz_common::{AppError, AppResult};
use markaz_db::entities::program;
use serde::Serialize;

use crate::{middleware::AppState, response::ApiResponse};

/// Program as shown to families and admins.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub registration_fee: i64,
    pub book_fee: i64,
    pub monthly_fee: i64,
    pub capacity: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl From<program::Model> for ProgramResponse {
    fn from(p: program::Model) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            registration_fee: p.registration_fee,
            book_fee: p.book_fee,
            monthly_fee: p.monthly_fee,
            capacity: p.capacity,
            is_active: p.is_active,
            created_at: p.created_at,
        }
    }
}

/// List programs open for registration.
async fn list(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<ProgramResponse>>> {
    let programs = state.program_service.list_active().await?;
    Ok(ApiResponse::ok(
        programs.into_iter().map(ProgramResponse::from).collect(),
    ))
}

/// Show a single active program.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ProgramResponse>> {
    let program = state
        .program_service
        .get_program(&id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::ProgramNotFound(id))?;

    Ok(ApiResponse::ok(program.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(show))
}
