//! Program catalog service.

use markaz_common::{AppError, AppResult, IdGenerator};
use markaz_db::{entities::program, repositories::ProgramRepository};
use sea_orm::Set;
use serde::{Deserialize, Deserializer};
use tracing::info;
use validator::Validate;

/// Program service for catalog reads and admin maintenance.
#[derive(Clone)]
pub struct ProgramService {
    program_repo: ProgramRepository,
    id_gen: IdGenerator,
}

/// Input for creating a program.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProgramInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,

    #[validate(length(max = 4096))]
    pub description: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub registration_fee: i64,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub book_fee: i64,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub monthly_fee: i64,

    #[validate(range(min = 1))]
    pub capacity: Option<i32>,

    pub is_active: Option<bool>,
}

/// Input for updating a program. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgramInput {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,

    #[validate(range(min = 0))]
    pub registration_fee: Option<i64>,

    #[validate(range(min = 0))]
    pub book_fee: Option<i64>,

    #[validate(range(min = 0))]
    pub monthly_fee: Option<i64>,

    #[serde(default, deserialize_with = "present")]
    pub capacity: Option<Option<i32>>,

    pub is_active: Option<bool>,
}

/// Keeps an explicit `null` apart from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProgramService {
    /// Create a new program service.
    #[must_use]
    pub fn new(program_repo: ProgramRepository) -> Self {
        Self {
            program_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Look up a program, `None` when the id does not resolve.
    pub async fn get_program(&self, id: &str) -> AppResult<Option<program::Model>> {
        self.program_repo.find_by_id(id).await
    }

    /// Get a program by ID.
    pub async fn get(&self, id: &str) -> AppResult<program::Model> {
        self.program_repo.get_by_id(id).await
    }

    /// Programs open to the public.
    pub async fn list_active(&self) -> AppResult<Vec<program::Model>> {
        self.program_repo.find_active().await
    }

    pub async fn list_all(&self) -> AppResult<Vec<program::Model>> {
        self.program_repo.find_all().await
    }

    /// Create a program.
    pub async fn create(&self, input: CreateProgramInput) -> AppResult<program::Model> {
        input.validate()?;

        let model = program::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            registration_fee: Set(input.registration_fee),
            book_fee: Set(input.book_fee),
            monthly_fee: Set(input.monthly_fee),
            capacity: Set(input.capacity),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let program = self.program_repo.create(model).await?;
        info!(program_id = %program.id, title = %program.title, "Program created");
        Ok(program)
    }

    /// Update a program.
    pub async fn update(&self, id: &str, input: UpdateProgramInput) -> AppResult<program::Model> {
        input.validate()?;
        if matches!(input.capacity, Some(Some(capacity)) if capacity < 1) {
            return Err(AppError::Validation(
                "capacity must be at least 1".to_string(),
            ));
        }

        let program = self.program_repo.get_by_id(id).await?;
        let mut active: program::ActiveModel = program.into();

        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(fee) = input.registration_fee {
            active.registration_fee = Set(fee);
        }
        if let Some(fee) = input.book_fee {
            active.book_fee = Set(fee);
        }
        if let Some(fee) = input.monthly_fee {
            active.monthly_fee = Set(fee);
        }
        if let Some(capacity) = input.capacity {
            active.capacity = Set(capacity);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        active.updated_at = Set(Some(chrono::Utc::now().into()));

        let program = self.program_repo.update(active).await?;
        info!(program_id = %program.id, "Program updated");
        Ok(program)
    }

    /// Delete a program that has no enrollments.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.program_repo.delete(id).await?;
        info!(program_id = %id, "Program deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_program(id: &str) -> program::Model {
        program::Model {
            id: id.to_string(),
            title: "Tahsin".to_string(),
            description: None,
            registration_fee: 50_000,
            book_fee: 75_000,
            monthly_fee: 250_000,
            capacity: None,
            is_active: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> ProgramService {
        ProgramService::new(ProgramRepository::new(Arc::new(db.into_connection())))
    }

    #[tokio::test]
    async fn test_get_program_missing_is_none() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<program::Model>::new()]),
        );

        assert!(svc.get_program("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_program() {
        let program = create_test_program("prog1");
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[program.clone()]]),
        );

        let created = svc
            .create(CreateProgramInput {
                title: "Tahsin".to_string(),
                description: None,
                registration_fee: 50_000,
                book_fee: 75_000,
                monthly_fee: 250_000,
                capacity: None,
                is_active: None,
            })
            .await
            .unwrap();

        assert_eq!(created.id, "prog1");
    }

    #[tokio::test]
    async fn test_create_rejects_negative_fee() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .create(CreateProgramInput {
                title: "Tahsin".to_string(),
                description: None,
                registration_fee: -1,
                book_fee: 0,
                monthly_fee: 0,
                capacity: None,
                is_active: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .create(CreateProgramInput {
                title: String::new(),
                description: None,
                registration_fee: 0,
                book_fee: 0,
                monthly_fee: 0,
                capacity: Some(10),
                is_active: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_zero_capacity() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .update(
                "prog1",
                UpdateProgramInput {
                    capacity: Some(Some(0)),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_program() {
        let program = create_test_program("prog1");
        let mut updated = program.clone();
        updated.monthly_fee = 275_000;

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[program.clone()]])
                .append_query_results([[updated.clone()]]),
        );

        let result = svc
            .update(
                "prog1",
                UpdateProgramInput {
                    monthly_fee: Some(275_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.monthly_fee, 275_000);
    }

    #[test]
    fn test_update_input_distinguishes_null_from_absent() {
        let cleared: UpdateProgramInput =
            serde_json::from_str(r#"{"capacity": null}"#).unwrap();
        assert_eq!(cleared.capacity, Some(None));
        assert_eq!(cleared.description, None);

        let set: UpdateProgramInput = serde_json::from_str(r#"{"capacity": 12}"#).unwrap();
        assert_eq!(set.capacity, Some(Some(12)));
    }
}
