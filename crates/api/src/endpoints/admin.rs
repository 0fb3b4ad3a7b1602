//! Administration endpoints.
//!
//! Every route here sits behind `require_admin`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    routing::{get, patch, post},
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, FixedOffset};
use markaz_common::{AppError, AppResult};
use markaz_core::{CreateProgramInput, PaymentReview, UpdateProgramInput};
use markaz_db::{
    entities::{
        enrollment::{self, EnrollmentStatus},
        payment::{self, PaymentKind, PaymentMethod, PaymentStatus},
    },
    repositories::EnrollmentFilter,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::programs::ProgramResponse;
use crate::{
    middleware::{AppState, require_admin},
    response::ApiResponse,
};

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 100;

const fn page_limit(limit: Option<u64>) -> u64 {
    match limit {
        Some(0) | None => DEFAULT_LIMIT,
        Some(n) if n > MAX_LIMIT => MAX_LIMIT,
        Some(n) => n,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: String,
    pub student_id: String,
    pub program_id: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl From<enrollment::Model> for EnrollmentResponse {
    fn from(e: enrollment::Model) -> Self {
        Self {
            id: e.id,
            student_id: e.student_id,
            program_id: e.program_id,
            status: e.status,
            enrolled_at: e.enrolled_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub enrollment_id: String,
    pub student_id: String,
    pub kind: PaymentKind,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub notes: String,
    pub created_at: DateTime<FixedOffset>,
    pub reviewed_at: Option<DateTime<FixedOffset>>,
}

impl From<payment::Model> for PaymentResponse {
    fn from(p: payment::Model) -> Self {
        Self {
            id: p.id,
            enrollment_id: p.enrollment_id,
            student_id: p.student_id,
            kind: p.kind,
            amount: p.amount,
            method: p.method,
            status: p.status,
            notes: p.notes,
            created_at: p.created_at,
            reviewed_at: p.reviewed_at,
        }
    }
}

/// Result of approving or rejecting a payment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub payment: PaymentResponse,
    pub enrollment: EnrollmentResponse,
}

impl From<PaymentReview> for ReviewResponse {
    fn from(review: PaymentReview) -> Self {
        Self {
            payment: review.payment.into(),
            enrollment: review.enrollment.into(),
        }
    }
}

// ==================== Programs ====================

async fn list_programs(
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ProgramResponse>>> {
    let programs = state.program_service.list_all().await?;
    Ok(ApiResponse::ok(
        programs.into_iter().map(ProgramResponse::from).collect(),
    ))
}

async fn create_program(
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<CreateProgramInput>, AppError>,
) -> AppResult<ApiResponse<ProgramResponse>> {
    let program = state.program_service.create(input).await?;
    Ok(ApiResponse::created(program.into()))
}

async fn update_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(input), _): WithRejection<Json<UpdateProgramInput>, AppError>,
) -> AppResult<ApiResponse<ProgramResponse>> {
    let program = state.program_service.update(&id, input).await?;
    Ok(ApiResponse::ok(program.into()))
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

async fn delete_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<DeletedResponse>> {
    state.program_service.delete(&id).await?;
    Ok(ApiResponse::ok(DeletedResponse { deleted: true }))
}

// ==================== Enrollments ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentListQuery {
    pub status: Option<EnrollmentStatus>,
    pub program_id: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

async fn list_enrollments(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<EnrollmentListQuery>, AppError>,
) -> AppResult<ApiResponse<Vec<EnrollmentResponse>>> {
    let filter = EnrollmentFilter {
        status: query.status,
        program_id: query.program_id,
    };

    let enrollments = state
        .payment_review_service
        .list_enrollments(&filter, page_limit(query.limit), query.offset.unwrap_or(0))
        .await?;

    Ok(ApiResponse::ok(
        enrollments.into_iter().map(EnrollmentResponse::from).collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentStatusRequest {
    pub status: EnrollmentStatus,
}

async fn set_enrollment_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<EnrollmentStatusRequest>, AppError>,
) -> AppResult<ApiResponse<EnrollmentResponse>> {
    let enrollment = state
        .payment_review_service
        .set_enrollment_status(&id, req.status)
        .await?;
    Ok(ApiResponse::ok(enrollment.into()))
}

// ==================== Payments ====================

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    pub status: Option<PaymentStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

async fn list_payments(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<PaymentListQuery>, AppError>,
) -> AppResult<ApiResponse<Vec<PaymentResponse>>> {
    let payments = state
        .payment_review_service
        .list(query.status, page_limit(query.limit), query.offset.unwrap_or(0))
        .await?;

    Ok(ApiResponse::ok(
        payments.into_iter().map(PaymentResponse::from).collect(),
    ))
}

async fn approve_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ReviewResponse>> {
    let review = state.payment_review_service.approve(&id).await?;
    Ok(ApiResponse::ok(review.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

/// Reject a payment. The body is optional.
async fn reject_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<RejectRequest>>,
) -> AppResult<ApiResponse<ReviewResponse>> {
    let reason = match body {
        Some(Json(req)) => {
            req.validate()?;
            req.reason
        }
        None => None,
    };

    let review = state
        .payment_review_service
        .reject(&id, reason.as_deref())
        .await?;
    Ok(ApiResponse::ok(review.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/programs", get(list_programs).post(create_program))
        .route("/programs/{id}", patch(update_program).delete(delete_program))
        .route("/enrollments", get(list_enrollments))
        .route("/enrollments/{id}/status", patch(set_enrollment_status))
        .route("/payments", get(list_payments))
        .route("/payments/{id}/approve", post(approve_payment))
        .route("/payments/{id}/reject", post(reject_payment))
        .route_layer(middleware::from_fn(require_admin))
}
