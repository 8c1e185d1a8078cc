//! Audit log of inbound COAR notifications

use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use softmention_common::db::ReceivedNotification;
use softmention_common::Result;

/// Store an inbound notification as received
pub async fn record_received_notification(
    pool: &SqlitePool,
    notification_type: &str,
    actor_id: Option<&str>,
    payload: &Value,
) -> Result<i64> {
    let notification_id = payload.get("id").and_then(Value::as_str);
    let payload_text = serde_json::to_string(payload)?;

    let result = sqlx::query(
        r#"
        INSERT INTO received_notifications (
            notification_id, notification_type, actor_id, payload, received_at
        ) VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(notification_id)
    .bind(notification_type)
    .bind(actor_id)
    .bind(&payload_text)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent notifications first
pub async fn list_received_notifications(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<ReceivedNotification>> {
    let rows = sqlx::query(
        r#"
        SELECT id, notification_id, notification_type, actor_id, payload, received_at
        FROM received_notifications
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let payload: String = row.get("payload");
            Ok(ReceivedNotification {
                id: row.get("id"),
                notification_id: row.get("notification_id"),
                notification_type: row.get("notification_type"),
                actor_id: row.get("actor_id"),
                payload: serde_json::from_str(&payload)?,
                received_at: row.get("received_at"),
            })
        })
        .collect()
}
