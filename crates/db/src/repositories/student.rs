//! Student repository.

use std::sync::Arc;

use crate::entities::{Student, student};
use markaz_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
};

/// Student repository for database operations.
#[derive(Clone)]
pub struct StudentRepository {
    db: Arc<DatabaseConnection>,
}

impl StudentRepository {
    /// Create a new student repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a student by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<student::Model>> {
        Student::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a student by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<student::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student: {id}")))
    }

    /// Find the student profile owned by a user.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<student::Model>> {
        Student::find()
            .filter(student::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new student on the given connection or transaction.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: student::ActiveModel,
    ) -> AppResult<student::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
