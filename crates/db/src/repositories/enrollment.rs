//! Enrollment repository.

use std::sync::Arc;

use crate::entities::{Enrollment, enrollment, enrollment::EnrollmentStatus};
use markaz_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Filter for admin enrollment listings.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentFilter {
    pub status: Option<EnrollmentStatus>,
    pub program_id: Option<String>,
}

/// Enrollment repository for database operations.
#[derive(Clone)]
pub struct EnrollmentRepository {
    db: Arc<DatabaseConnection>,
}

impl EnrollmentRepository {
    /// Create a new enrollment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an enrollment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<enrollment::Model>> {
        Enrollment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an enrollment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<enrollment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::EnrollmentNotFound(id.to_string()))
    }

    /// Count enrollments holding a seat in a program (pending or active).
    pub async fn count_occupying_by_program(&self, program_id: &str) -> AppResult<u64> {
        Enrollment::find()
            .filter(enrollment::Column::ProgramId.eq(program_id))
            .filter(
                enrollment::Column::Status
                    .is_in([EnrollmentStatus::Pending, EnrollmentStatus::Active]),
            )
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List enrollments, newest first.
    pub async fn find_with_filter(
        &self,
        filter: &EnrollmentFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<enrollment::Model>> {
        let mut query = Enrollment::find().order_by_desc(enrollment::Column::EnrolledAt);

        if let Some(status) = filter.status {
            query = query.filter(enrollment::Column::Status.eq(status));
        }
        if let Some(program_id) = &filter.program_id {
            query = query.filter(enrollment::Column::ProgramId.eq(program_id.as_str()));
        }

        query
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new enrollment on the given connection or transaction.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: enrollment::ActiveModel,
    ) -> AppResult<enrollment::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the status of an enrollment.
    pub async fn update_status(
        &self,
        enrollment: enrollment::Model,
        status: EnrollmentStatus,
    ) -> AppResult<enrollment::Model> {
        self.update_status_in(self.db.as_ref(), enrollment, status)
            .await
    }

    /// Load an enrollment and lock its row until the transaction ends.
    pub async fn get_for_update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<enrollment::Model> {
        Enrollment::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::EnrollmentNotFound(id.to_string()))
    }

    /// Set the status of an enrollment on the given connection or transaction.
    pub async fn update_status_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        enrollment: enrollment::Model,
        status: EnrollmentStatus,
    ) -> AppResult<enrollment::Model> {
        let mut active: enrollment::ActiveModel = enrollment.into();
        active.status = Set(status);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        active
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
