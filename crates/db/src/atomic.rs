//! Transaction boundary for multi-row writes.

use std::{future::Future, pin::Pin};

use markaz_common::{AppError, AppResult};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};

/// Run `f` inside a database transaction.
///
/// The transaction commits when `f` returns `Ok` and rolls back otherwise, so
/// callers never leave a partial set of rows behind. Errors produced by `f`
/// are returned unchanged; failures to begin or commit become
/// [`AppError::Database`].
pub async fn run_atomic<F, T>(db: &DatabaseConnection, f: F) -> AppResult<T>
where
    F: for<'c> FnOnce(
            &'c DatabaseTransaction,
        ) -> Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'c>>
        + Send,
    T: Send,
{
    db.transaction::<F, T, AppError>(f)
        .await
        .map_err(|e| match e {
            TransactionError::Connection(err) => AppError::Database(err.to_string()),
            TransactionError::Transaction(err) => err,
        })
}
