//! Payment repository.

use std::sync::Arc;

use crate::entities::{Payment, payment, payment::PaymentStatus};
use markaz_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Payment repository for database operations.
#[derive(Clone)]
pub struct PaymentRepository {
    db: Arc<DatabaseConnection>,
}

impl PaymentRepository {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a payment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<payment::Model>> {
        Payment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a payment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<payment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment: {id}")))
    }

    /// Load a payment and lock its row until the transaction ends.
    pub async fn get_for_update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<payment::Model> {
        Payment::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Payment: {id}")))
    }

    /// All payments of an enrollment, in the order they were created.
    pub async fn find_by_enrollment_id(
        &self,
        enrollment_id: &str,
    ) -> AppResult<Vec<payment::Model>> {
        Payment::find()
            .filter(payment::Column::EnrollmentId.eq(enrollment_id))
            .order_by_asc(payment::Column::CreatedAt)
            .order_by_asc(payment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List payments, newest first, optionally by status.
    pub async fn find_with_filter(
        &self,
        status: Option<PaymentStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<payment::Model>> {
        let mut query = Payment::find().order_by_desc(payment::Column::CreatedAt);

        if let Some(status) = status {
            query = query.filter(payment::Column::Status.eq(status));
        }

        query
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new payment on the given connection or transaction.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: payment::ActiveModel,
    ) -> AppResult<payment::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a payment on the given connection or transaction.
    pub async fn update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: payment::ActiveModel,
    ) -> AppResult<payment::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::payment::{PaymentKind, PaymentMethod};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_payment(id: &str, kind: PaymentKind, amount: i64) -> payment::Model {
        payment::Model {
            id: id.to_string(),
            enrollment_id: "enr1".to_string(),
            student_id: "student1".to_string(),
            kind,
            amount,
            method: PaymentMethod::Transfer,
            status: PaymentStatus::Pending,
            notes: "registration fee".to_string(),
            created_at: Utc::now().into(),
            reviewed_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_enrollment_id() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    create_test_payment("pay1", PaymentKind::Registration, 50_000),
                    create_test_payment("pay2", PaymentKind::Book, 100_000),
                ]])
                .into_connection(),
        );

        let repo = PaymentRepository::new(db);
        let payments = repo.find_by_enrollment_id("enr1").await.unwrap();

        assert_eq!(payments.len(), 2);
        assert_eq!(payments.iter().map(|p| p.amount).sum::<i64>(), 150_000);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<payment::Model>::new()])
                .into_connection(),
        );

        let repo = PaymentRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
