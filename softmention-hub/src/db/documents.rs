//! Document lookups

use sqlx::{Row, SqlitePool};
use softmention_common::db::DocumentRecord;
use softmention_common::Result;
use tracing::warn;

/// Check whether a document with this identifier was already ingested
pub async fn document_exists(pool: &SqlitePool, file_hal_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE file_hal_id = ?")
        .bind(file_hal_id)
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

/// Fetch a document by identifier
///
/// Query failures are logged and reported as "not found".
pub async fn find_document(pool: &SqlitePool, file_hal_id: &str) -> Option<DocumentRecord> {
    let row = sqlx::query("SELECT id, file_hal_id, created_at FROM documents WHERE file_hal_id = ?")
        .bind(file_hal_id)
        .fetch_optional(pool)
        .await;

    match row {
        Ok(Some(row)) => Some(DocumentRecord {
            id: row.get("id"),
            file_hal_id: row.get("file_hal_id"),
            created_at: row.get("created_at"),
        }),
        Ok(None) => None,
        Err(e) => {
            warn!(file_hal_id = file_hal_id, error = %e, "Document lookup failed");
            None
        }
    }
}

pub async fn count_documents(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
