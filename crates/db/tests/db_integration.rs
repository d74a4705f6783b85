//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `cityfix_test`)
//!   `TEST_DB_PASSWORD` (default: `cityfix_test`)
//!   `TEST_DB_NAME` (default: `cityfix_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use cityfix_db::entities::report::{self, ReportStatus};
use cityfix_db::entities::user::{self, Role};
use cityfix_db::repositories::{ReportRepository, UserRepository};
use cityfix_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::Set;
use std::sync::Arc;

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_migrate_and_roundtrip_report() {
    let db = TestDatabase::create_unique().await.expect("create db");
    let conn = Arc::new(
        sea_orm::Database::connect(db.config.database_url())
            .await
            .expect("connect"),
    );

    cityfix_db::migrate(conn.as_ref()).await.expect("migrate");

    let users = UserRepository::new(conn.clone());
    let citizen = users
        .create(user::ActiveModel {
            id: Set("citizen1".to_string()),
            email: Set("citizen1@example.com".to_string()),
            name: Set("Jane Citizen".to_string()),
            role: Set(Role::Citizen),
            is_disabled: Set(false),
            push_token: Set(None),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        })
        .await
        .expect("create user");

    let reports = ReportRepository::new(conn);
    let created = reports
        .create(report::ActiveModel {
            id: Set("report1".to_string()),
            title: Set("Pothole on Elm St".to_string()),
            description: Set("Deep pothole".to_string()),
            category: Set("Roads".to_string()),
            address: Set("12 Elm St".to_string()),
            latitude: Set(40.7),
            longitude: Set(-74.0),
            before_photos: Set(serde_json::json!(["https://files/1.jpg"])),
            user_id: Set(citizen.id),
            user_name: Set(citizen.name),
            status: Set(ReportStatus::Submitted),
            is_draft: Set(false),
            is_deleted: Set(false),
            duplicate_count: Set(0),
            created_at: Set(Utc::now().into()),
            submitted_at: Set(Some(Utc::now().into())),
            ..Default::default()
        })
        .await
        .expect("create report");

    let fetched = reports.get_by_id(&created.id).await.expect("fetch");
    assert_eq!(fetched.status, ReportStatus::Submitted);

    let queue = reports
        .list_by_status(ReportStatus::Submitted)
        .await
        .expect("queue");
    assert_eq!(queue.len(), 1);

    db.drop_database().await.expect("drop db");
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
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
    assert!(url.contains("testuser"));
    assert!(url.contains("testdb"));
}

#[test]
fn test_postgres_url_format() {
    let config = TestDbConfig::default();
    let url = config.postgres_url();
    assert!(url.ends_with("/postgres"));
}
