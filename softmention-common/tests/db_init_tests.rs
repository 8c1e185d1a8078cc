//! Tests for database initialization
//!
//! - Automatic database creation on first run
//! - Idempotent schema creation on existing databases
//! - Uniqueness constraints backing ingestion idempotency

use softmention_common::db::init::{
    create_schema, init_database, init_memory_database, table_exists, GRAPH_TABLES,
};
use tempfile::tempdir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("nested").join("softmention.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("softmention.db");

    let pool1 = init_database(&db_path).await.expect("first open");
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_graph_tables_created() {
    let pool = init_memory_database().await.unwrap();

    for table in GRAPH_TABLES {
        assert!(table_exists(&pool, table).await.unwrap(), "missing table {}", table);
    }
    assert!(table_exists(&pool, "received_notifications").await.unwrap());
    assert!(!table_exists(&pool, "no_such_table").await.unwrap());
}

#[tokio::test]
async fn test_schema_creation_is_idempotent() {
    let pool = init_memory_database().await.unwrap();

    create_schema(&pool).await.expect("second create_schema should succeed");
}

#[tokio::test]
async fn test_document_identifier_is_unique() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO documents (file_hal_id, created_at) VALUES ('hal-001', 'now')")
        .execute(&pool)
        .await
        .unwrap();

    let second = sqlx::query("INSERT INTO documents (file_hal_id, created_at) VALUES ('hal-001', 'now')")
        .execute(&pool)
        .await;

    assert!(second.is_err(), "Duplicate file_hal_id must be rejected");
}

#[tokio::test]
async fn test_mention_has_single_inbound_edge() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO documents (file_hal_id, created_at) VALUES ('a', 'now'), ('b', 'now')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO software_mentions (normalized_name, attributes, created_at) VALUES ('Grobid', '{}', 'now')",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO mention_edges (document_id, mention_id) VALUES (1, 1)")
        .execute(&pool)
        .await
        .unwrap();
    let second_edge = sqlx::query("INSERT INTO mention_edges (document_id, mention_id) VALUES (2, 1)")
        .execute(&pool)
        .await;

    assert!(second_edge.is_err());
}
