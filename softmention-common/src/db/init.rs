//! Database initialization
//!
//! The mention graph is stored as three tables: `documents`,
//! `software_mentions` and `mention_edges` (document → mention). Inbound COAR
//! notifications are kept in `received_notifications` for audit.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Tables the service expects to find, in creation order
pub const GRAPH_TABLES: [&str; 3] = ["documents", "software_mentions", "mention_edges"];

/// Open (or create) the database file and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL allows concurrent readers with one writer; busy_timeout makes a
    // second writer wait for the lock instead of failing with SQLITE_BUSY
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Uses a single connection that never expires, since every SQLite
/// `:memory:` connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_documents_table(pool).await?;
    create_software_mentions_table(pool).await?;
    create_mention_edges_table(pool).await?;
    create_received_notifications_table(pool).await?;
    Ok(())
}

/// Check whether a table exists
pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(table_name)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

async fn create_documents_table(pool: &SqlitePool) -> Result<()> {
    // UNIQUE(file_hal_id) is what makes concurrent ingestion of the same
    // identifier safe: the second INSERT conflicts instead of duplicating
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_hal_id TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_software_mentions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS software_mentions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            normalized_name TEXT NOT NULL,
            software_type TEXT,
            used_score REAL,
            created_score REAL,
            shared_score REAL,
            contexts TEXT NOT NULL DEFAULT '[]',
            verification_by_author INTEGER,
            attributes TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_software_mentions_name ON software_mentions(normalized_name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_mention_edges_table(pool: &SqlitePool) -> Result<()> {
    // mention_id is UNIQUE: each mention has exactly one inbound edge
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mention_edges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            mention_id INTEGER NOT NULL UNIQUE REFERENCES software_mentions(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_mention_edges_document ON mention_edges(document_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_received_notifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS received_notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            notification_id TEXT,
            notification_type TEXT NOT NULL,
            actor_id TEXT,
            payload TEXT NOT NULL,
            received_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
