//! Payment review for administrators.
//!
//! Reviewing a payment also moves its enrollment: an approval activates a
//! pending enrollment, a rejection cancels it. Both rows change together.

use std::sync::Arc;

use markaz_common::{AppError, AppResult};
use markaz_db::{
    entities::{
        enrollment::{self, EnrollmentStatus},
        payment::{self, PaymentStatus},
    },
    repositories::{EnrollmentFilter, EnrollmentRepository, PaymentRepository},
    run_atomic,
};
use sea_orm::{DatabaseConnection, Set};
use serde::Serialize;
use tracing::info;

/// A reviewed payment together with its enrollment after the review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReview {
    pub payment: payment::Model,
    pub enrollment: enrollment::Model,
}

/// Payment review service.
#[derive(Clone)]
pub struct PaymentReviewService {
    db: Arc<DatabaseConnection>,
    payment_repo: PaymentRepository,
    enrollment_repo: EnrollmentRepository,
}

/// Whether an administrator may move an enrollment from `from` to `to`.
#[must_use]
pub const fn is_allowed_transition(from: EnrollmentStatus, to: EnrollmentStatus) -> bool {
    matches!(
        (from, to),
        (EnrollmentStatus::Pending, EnrollmentStatus::Active | EnrollmentStatus::Cancelled)
            | (EnrollmentStatus::Active, EnrollmentStatus::Completed | EnrollmentStatus::Cancelled)
    )
}

impl PaymentReviewService {
    /// Create a new payment review service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            payment_repo: PaymentRepository::new(db.clone()),
            enrollment_repo: EnrollmentRepository::new(db.clone()),
            db,
        }
    }

    /// List payments, optionally by status.
    pub async fn list(
        &self,
        status: Option<PaymentStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<payment::Model>> {
        self.payment_repo.find_with_filter(status, limit, offset).await
    }

    /// List enrollments.
    pub async fn list_enrollments(
        &self,
        filter: &EnrollmentFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<enrollment::Model>> {
        self.enrollment_repo
            .find_with_filter(filter, limit, offset)
            .await
    }

    /// Approve a pending payment and activate its enrollment.
    pub async fn approve(&self, payment_id: &str) -> AppResult<PaymentReview> {
        let review = self.review(payment_id, Verdict::Approve).await?;

        info!(
            payment_id = %review.payment.id,
            enrollment_id = %review.enrollment.id,
            "Payment approved"
        );
        Ok(review)
    }

    /// Reject a pending payment and cancel its enrollment.
    ///
    /// Completed enrollments are left as they are.
    pub async fn reject(&self, payment_id: &str, reason: Option<&str>) -> AppResult<PaymentReview> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let review = self.review(payment_id, Verdict::Reject(reason)).await?;

        info!(
            payment_id = %review.payment.id,
            enrollment_id = %review.enrollment.id,
            "Payment rejected"
        );
        Ok(review)
    }

    /// Explicit admin transition of an enrollment.
    pub async fn set_enrollment_status(
        &self,
        enrollment_id: &str,
        status: EnrollmentStatus,
    ) -> AppResult<enrollment::Model> {
        let enrollments = self.enrollment_repo.clone();
        let enrollment_id = enrollment_id.to_string();

        let updated = run_atomic(self.db.as_ref(), move |txn| {
            Box::pin(async move {
                let enrollment = enrollments.get_for_update_in(txn, &enrollment_id).await?;

                if enrollment.status == status {
                    return Ok(enrollment);
                }
                if !is_allowed_transition(enrollment.status, status) {
                    return Err(AppError::BadRequest(format!(
                        "cannot move enrollment from {:?} to {:?}",
                        enrollment.status, status
                    )));
                }

                enrollments.update_status_in(txn, enrollment, status).await
            })
        })
        .await?;
        info!(enrollment_id = %updated.id, status = ?updated.status, "Enrollment status changed");
        Ok(updated)
    }

    /// Reviews a payment inside one transaction.
    ///
    /// The payment and its enrollment are read with row locks, so a
    /// concurrent review of the same payment waits and then sees it is no
    /// longer pending.
    async fn review(&self, payment_id: &str, verdict: Verdict) -> AppResult<PaymentReview> {
        let payments = self.payment_repo.clone();
        let enrollments = self.enrollment_repo.clone();
        let payment_id = payment_id.to_string();

        run_atomic(self.db.as_ref(), move |txn| {
            Box::pin(async move {
                let payment = payments.get_for_update_in(txn, &payment_id).await?;
                if payment.status != PaymentStatus::Pending {
                    return Err(AppError::BadRequest("payment already reviewed".to_string()));
                }

                let enrollment = enrollments
                    .get_for_update_in(txn, &payment.enrollment_id)
                    .await?;

                let next = verdict.enrollment_status(enrollment.status);
                let payment = payments.update_in(txn, verdict.apply(payment)).await?;
                let enrollment = match next {
                    Some(status) => enrollments.update_status_in(txn, enrollment, status).await?,
                    None => enrollment,
                };

                Ok::<_, AppError>(PaymentReview {
                    payment,
                    enrollment,
                })
            })
        })
        .await
    }
}

/// Outcome an administrator chose for a pending payment.
enum Verdict {
    Approve,
    Reject(Option<String>),
}

impl Verdict {
    fn apply(&self, payment: payment::Model) -> payment::ActiveModel {
        let (status, notes) = match self {
            Self::Approve => (PaymentStatus::Approved, None),
            Self::Reject(reason) => {
                let notes = match reason {
                    Some(reason) if payment.notes.is_empty() => Some(format!("rejected: {reason}")),
                    Some(reason) => Some(format!("{} (rejected: {reason})", payment.notes)),
                    None => None,
                };
                (PaymentStatus::Rejected, notes)
            }
        };

        let mut model: payment::ActiveModel = payment.into();
        model.status = Set(status);
        if let Some(notes) = notes {
            model.notes = Set(notes);
        }
        model.reviewed_at = Set(Some(chrono::Utc::now().into()));
        model
    }

    /// Status the enrollment moves to, if any.
    fn enrollment_status(&self, current: EnrollmentStatus) -> Option<EnrollmentStatus> {
        match self {
            Self::Approve => (current == EnrollmentStatus::Pending).then_some(EnrollmentStatus::Active),
            Self::Reject(_) => (!current.is_terminal()).then_some(EnrollmentStatus::Cancelled),
        }
    }
}
