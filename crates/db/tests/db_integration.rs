//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `markaz_test`)
//!   `TEST_DB_PASSWORD` (default: `markaz_test`)
//!   `TEST_DB_NAME` (default: `markaz_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use markaz_common::AppError;
use markaz_db::{
    entities::{
        enrollment::{self, EnrollmentStatus},
        program, student,
        user::{self, UserRole},
    },
    repositories::{EnrollmentRepository, ProgramRepository, StudentRepository, UserRepository},
    run_atomic,
    test_utils::{TestDatabase, TestDbConfig},
};
use sea_orm::{Database, Set};

fn user_model(id: &str, email: &str) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(id.to_string()),
        email: Set(email.to_string()),
        name: Set("Fatimah".to_string()),
        password_hash: Set("not-a-real-hash".to_string()),
        role: Set(UserRole::Student),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

fn program_model(id: &str) -> program::ActiveModel {
    program::ActiveModel {
        id: Set(id.to_string()),
        title: Set("Tahfidz".to_string()),
        description: Set(None),
        registration_fee: Set(50_000),
        book_fee: Set(100_000),
        monthly_fee: Set(300_000),
        capacity: Set(Some(2)),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_email_maps_to_duplicate_email() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let users = UserRepository::new(Arc::new(Database::connect(db.config.database_url()).await.unwrap()));

    users.create(user_model("u1", "parent@example.com")).await.unwrap();
    let result = users.create(user_model("u2", "parent@example.com")).await;

    assert!(matches!(result, Err(AppError::DuplicateEmail)));
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_failed_transaction_leaves_no_rows() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let conn = Arc::new(Database::connect(db.config.database_url()).await.unwrap());
    let users = UserRepository::new(conn.clone());

    let repo = users.clone();
    let result: Result<(), AppError> = run_atomic(&conn, move |txn| {
        Box::pin(async move {
            repo.create_in(txn, user_model("u1", "first@example.com")).await?;
            Err(AppError::Internal("abort".to_string()))
        })
    })
    .await;

    assert!(result.is_err());
    assert!(users.find_by_id("u1").await.unwrap().is_none());
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_program_with_enrollments_cannot_be_deleted() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let conn = Arc::new(Database::connect(db.config.database_url()).await.unwrap());
    let programs = ProgramRepository::new(conn.clone());
    let users = UserRepository::new(conn.clone());
    let students = StudentRepository::new(conn.clone());
    let enrollments = EnrollmentRepository::new(conn.clone());

    programs.create(program_model("p1")).await.unwrap();
    users.create(user_model("u1", "parent@example.com")).await.unwrap();
    students
        .create_in(
            conn.as_ref(),
            student::ActiveModel {
                id: Set("s1".to_string()),
                user_id: Set("u1".to_string()),
                name: Set("Aisyah".to_string()),
                birth_date: Set(None),
                address: Set(None),
                phone: Set(None),
                parent_name: Set("Fatimah".to_string()),
                parent_phone: Set("081234567890".to_string()),
                parent_email: Set("fatimah@example.com".to_string()),
                is_active: Set(true),
                created_at: Set(Utc::now().into()),
            },
        )
        .await
        .unwrap();
    enrollments
        .create_in(
            conn.as_ref(),
            enrollment::ActiveModel {
                id: Set("e1".to_string()),
                student_id: Set("s1".to_string()),
                program_id: Set("p1".to_string()),
                status: Set(EnrollmentStatus::Pending),
                enrolled_at: Set(Utc::now().into()),
                updated_at: Set(None),
            },
        )
        .await
        .unwrap();

    assert_eq!(enrollments.count_occupying_by_program("p1").await.unwrap(), 1);
    assert!(matches!(
        programs.delete("p1").await,
        Err(AppError::Conflict(_))
    ));
    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost:5432"));
    assert!(url.ends_with("/testdb"));
}
