//! Program repository.

use std::sync::Arc;

use crate::entities::{Program, program};
use markaz_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, SqlErr,
};

/// Program repository for database operations.
#[derive(Clone)]
pub struct ProgramRepository {
    db: Arc<DatabaseConnection>,
}

impl ProgramRepository {
    /// Create a new program repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a program by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<program::Model>> {
        Program::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a program by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<program::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ProgramNotFound(id.to_string()))
    }

    /// Programs shown in the public catalog.
    pub async fn find_active(&self) -> AppResult<Vec<program::Model>> {
        Program::find()
            .filter(program::Column::IsActive.eq(true))
            .order_by_asc(program::Column::Title)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All programs, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<program::Model>> {
        Program::find()
            .order_by_desc(program::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new program.
    pub async fn create(&self, model: program::ActiveModel) -> AppResult<program::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a program.
    pub async fn update(&self, model: program::ActiveModel) -> AppResult<program::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a program.
    ///
    /// Programs that still have enrollments are protected by a restricting
    /// foreign key; that case surfaces as [`AppError::Conflict`].
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = Program::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(map_delete_error)?;

        if result.rows_affected == 0 {
            return Err(AppError::ProgramNotFound(id.to_string()));
        }
        Ok(())
    }
}

fn map_delete_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            AppError::Conflict("program still has enrollments".to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_program(id: &str, title: &str) -> program::Model {
        program::Model {
            id: id.to_string(),
            title: title.to_string(),
            description: Some("Tahsin and tahfidz for children".to_string()),
            registration_fee: 50_000,
            book_fee: 100_000,
            monthly_fee: 300_000,
            capacity: Some(20),
            is_active: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_found() {
        let program = create_test_program("prog1", "Tahfidz");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[program.clone()]])
                .into_connection(),
        );

        let repo = ProgramRepository::new(db);
        let found = repo.get_by_id("prog1").await.unwrap();

        assert_eq!(found.title, "Tahfidz");
        assert_eq!(found.monthly_fee, 300_000);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_program_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<program::Model>::new()])
                .into_connection(),
        );

        let repo = ProgramRepository::new(db);
        let result = repo.get_by_id("missing").await;

        match result {
            Err(AppError::ProgramNotFound(id)) => assert_eq!(id, "missing"),
            _ => panic!("Expected ProgramNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_active() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    create_test_program("prog1", "Iqro"),
                    create_test_program("prog2", "Tahfidz"),
                ]])
                .into_connection(),
        );

        let repo = ProgramRepository::new(db);
        let programs = repo.find_active().await.unwrap();

        assert_eq!(programs.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_program() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = ProgramRepository::new(db);
        let result = repo.delete("missing").await;

        assert!(matches!(result, Err(AppError::ProgramNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_program() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = ProgramRepository::new(db);
        assert!(repo.delete("prog1").await.is_ok());
    }
}
