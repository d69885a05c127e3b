//! Database initialization
//!
//! Creates the database on first run and brings the schema up idempotently
//! (`CREATE TABLE IF NOT EXISTS`), so services can share one database file
//! and start in any order.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; resolve transactions
    // from multiple channels contend on the same rows
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Bounded wait on row locks instead of immediate SQLITE_BUSY
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent; also used directly by test setups)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_customers_table(pool).await?;
    create_team_members_table(pool).await?;
    create_bank_transactions_table(pool).await?;
    create_payment_attributions_table(pool).await?;
    create_resolution_items_table(pool).await?;
    create_system_proposals_table(pool).await?;
    create_system_rules_table(pool).await?;
    create_audit_log_table(pool).await?;
    Ok(())
}

async fn create_customers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            bank_name TEXT,
            aliases TEXT NOT NULL DEFAULT '[]',
            email_domain TEXT,
            sheet_name TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_team_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_members (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_bank_transactions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bank_transactions (
            guid TEXT PRIMARY KEY,
            counterparty TEXT NOT NULL,
            amount REAL NOT NULL,
            posted_at TEXT NOT NULL,
            customer_id TEXT REFERENCES customers(guid),
            is_reconciled INTEGER NOT NULL DEFAULT 0,
            settlement_month TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_bank_transactions_unreconciled
         ON bank_transactions(is_reconciled)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_payment_attributions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payment_attributions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT NOT NULL REFERENCES bank_transactions(guid),
            team_member_id TEXT NOT NULL REFERENCES team_members(guid),
            amount REAL NOT NULL,
            settlement_month TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(transaction_id, team_member_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_resolution_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resolution_items (
            guid TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            source_entity TEXT NOT NULL,
            suggested_match TEXT,
            confidence INTEGER NOT NULL DEFAULT 0,
            context TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            resolved_at TIMESTAMP,
            resolved_via TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(kind, source_entity)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_resolution_items_status
         ON resolution_items(status, confidence)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_system_proposals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS system_proposals (
            guid TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            description TEXT NOT NULL,
            evidence TEXT NOT NULL DEFAULT '{}',
            payload TEXT NOT NULL,
            pattern TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            source_item_id TEXT REFERENCES resolution_items(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            resolved_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_system_proposals_pending
         ON system_proposals(status, kind, pattern)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_system_rules_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS system_rules (
            guid TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            source_proposal_id TEXT REFERENCES system_proposals(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deactivated_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_audit_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            resolution_item_id TEXT,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            field TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_audit_log_item
         ON audit_log(resolution_item_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}
