//! Shared setup for integration tests

// not every test binary uses every helper
#![allow(dead_code)]

use opsd_common::db::init_database;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// File-backed test database; WAL + busy timeout behave like production,
/// which matters for the concurrency tests
pub async fn setup_db() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let pool = init_database(&dir.path().join("test.db"))
        .await
        .expect("init database");
    (pool, dir)
}

pub async fn seed_customer(
    pool: &SqlitePool,
    name: &str,
    bank_name: Option<&str>,
    aliases: &[&str],
) -> Uuid {
    let guid = Uuid::new_v4();
    let aliases_json = serde_json::to_string(aliases).unwrap();
    sqlx::query(
        "INSERT INTO customers (guid, name, bank_name, aliases) VALUES (?, ?, ?, ?)",
    )
    .bind(guid.to_string())
    .bind(name)
    .bind(bank_name)
    .bind(aliases_json)
    .execute(pool)
    .await
    .unwrap();
    guid
}

pub async fn seed_team_member(pool: &SqlitePool, name: &str) -> Uuid {
    let guid = Uuid::new_v4();
    sqlx::query("INSERT INTO team_members (guid, name) VALUES (?, ?)")
        .bind(guid.to_string())
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    guid
}

pub async fn seed_transaction(
    pool: &SqlitePool,
    counterparty: &str,
    amount: f64,
    posted_at: &str,
) -> Uuid {
    let guid = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO bank_transactions (guid, counterparty, amount, posted_at) VALUES (?, ?, ?, ?)",
    )
    .bind(guid.to_string())
    .bind(counterparty)
    .bind(amount)
    .bind(posted_at)
    .execute(pool)
    .await
    .unwrap();
    guid
}

pub async fn audit_count(pool: &SqlitePool, item_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE resolution_item_id = ?")
        .bind(item_id.to_string())
        .fetch_one(pool)
        .await
        .unwrap()
}
