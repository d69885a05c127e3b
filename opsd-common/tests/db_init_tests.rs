//! Tests for database initialization and schema idempotency

use opsd_common::db::init::{create_schema, init_database};
use sqlx::SqlitePool;
use std::path::PathBuf;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let test_db = format!("/tmp/opsd-test-db-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let result = init_database(&db_path).await;
    assert!(
        result.is_ok(),
        "Database initialization failed: {:?}",
        result.err()
    );
    assert!(db_path.exists(), "Database file was not created");

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let test_db = format!("/tmp/opsd-test-db-existing-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    // Opening a second time must not fail or lose the schema
    let pool2 = init_database(&db_path).await;
    assert!(
        pool2.is_ok(),
        "Failed to open existing database: {:?}",
        pool2.err()
    );

    drop(pool1);
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_schema_creation_is_idempotent() {
    let pool = SqlitePool::connect(":memory:").await.unwrap();

    create_schema(&pool).await.unwrap();
    create_schema(&pool).await.unwrap();

    // Natural key constraint must be in place
    sqlx::query(
        "INSERT INTO resolution_items (guid, kind, source_entity) VALUES ('a', 'customer_match', 'ACME')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let dup = sqlx::query(
        "INSERT INTO resolution_items (guid, kind, source_entity) VALUES ('b', 'customer_match', 'ACME')",
    )
    .execute(&pool)
    .await;

    assert!(dup.is_err(), "duplicate (kind, source_entity) must be rejected");
}
