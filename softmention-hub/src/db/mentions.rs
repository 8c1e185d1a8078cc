//! Software mention persistence
//!
//! A document and all of its mentions are written in one transaction. The
//! `UNIQUE(file_hal_id)` constraint decides which of two concurrent uploads
//! of the same document wins; the loser sees [`InsertOutcome::AlreadyExists`].

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use softmention_common::db::StoredMention;
use softmention_common::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, info};

use super::documents::document_exists;
use crate::blacklist::Blacklist;
use crate::models::{group_mentions, GroupedMention, RawMention};

const MENTION_COLUMNS: &str = r#"
    m.id, d.file_hal_id, m.normalized_name, m.software_type,
    m.used_score, m.created_score, m.shared_score,
    m.contexts, m.verification_by_author, m.attributes
"#;

/// Result of [`insert_mentions`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted {
        document_id: i64,
        /// Mentions written (after dedup and blacklist filtering)
        stored: usize,
        /// Structurally identical entries collapsed
        duplicates: usize,
        /// Entries dropped because their name is blacklisted
        blacklisted: usize,
    },
    AlreadyExists,
}

impl InsertOutcome {
    pub fn inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

/// Store a document and its mentions
///
/// Nothing is written if the document already exists or if any mention
/// fails validation. Duplicate entries within `raw_mentions` are stored once;
/// blacklisted names are skipped. A document with zero surviving mentions is
/// still created.
pub async fn insert_mentions(
    pool: &SqlitePool,
    blacklist: &Blacklist,
    file_hal_id: &str,
    raw_mentions: &[Value],
) -> Result<InsertOutcome> {
    if file_hal_id.trim().is_empty() {
        return Err(Error::InvalidInput("document identifier is empty".to_string()));
    }

    if document_exists(pool, file_hal_id).await? {
        info!(file_hal_id = file_hal_id, "Document already exists, skipping");
        return Ok(InsertOutcome::AlreadyExists);
    }

    let unique = dedup_mentions(raw_mentions);
    let duplicates = raw_mentions.len() - unique.len();

    let mut parsed = Vec::with_capacity(unique.len());
    for value in unique {
        let mention = RawMention::parse(value).map_err(Error::InvalidInput)?;
        parsed.push((mention, value));
    }

    let mut accepted = Vec::with_capacity(parsed.len());
    let mut blacklisted = 0;
    for (mention, value) in parsed {
        if blacklist.is_blacklisted(mention.normalized_name()).await {
            debug!(name = mention.normalized_name(), "Skipping blacklisted mention");
            blacklisted += 1;
            continue;
        }
        accepted.push((mention, value));
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO documents (file_hal_id, created_at) VALUES (?, ?) ON CONFLICT(file_hal_id) DO NOTHING",
    )
    .bind(file_hal_id)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        // Lost the race against a concurrent upload of the same document
        tx.rollback().await?;
        info!(file_hal_id = file_hal_id, "Document created concurrently, skipping");
        return Ok(InsertOutcome::AlreadyExists);
    }
    let document_id = result.last_insert_rowid();

    for (mention, value) in &accepted {
        let scores = mention.scores();
        let contexts = serde_json::to_string(&mention.contexts())?;
        let attributes = serde_json::to_string(&RawMention::stored_attributes(value))?;

        let mention_id = sqlx::query(
            r#"
            INSERT INTO software_mentions (
                normalized_name, software_type, used_score, created_score, shared_score,
                contexts, attributes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(mention.normalized_name())
        .bind(&mention.software_type)
        .bind(scores.used)
        .bind(scores.created)
        .bind(scores.shared)
        .bind(&contexts)
        .bind(&attributes)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("INSERT INTO mention_edges (document_id, mention_id) VALUES (?, ?)")
            .bind(document_id)
            .bind(mention_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!(
        file_hal_id = file_hal_id,
        stored = accepted.len(),
        duplicates = duplicates,
        blacklisted = blacklisted,
        "Document inserted"
    );

    Ok(InsertOutcome::Inserted {
        document_id,
        stored: accepted.len(),
        duplicates,
        blacklisted,
    })
}

/// Mentions of a document, optionally restricted to one normalized name
pub async fn get_document_software(
    pool: &SqlitePool,
    file_hal_id: &str,
    normalized_name: Option<&str>,
) -> Result<Vec<StoredMention>> {
    let mut sql = format!(
        r#"
        SELECT {MENTION_COLUMNS}
        FROM documents d
        JOIN mention_edges e ON e.document_id = d.id
        JOIN software_mentions m ON m.id = e.mention_id
        WHERE d.file_hal_id = ?
        "#
    );
    if normalized_name.is_some() {
        sql.push_str(" AND m.normalized_name = ?");
    }
    sql.push_str(" ORDER BY m.id");

    let mut query = sqlx::query(&sql).bind(file_hal_id);
    if let Some(name) = normalized_name {
        query = query.bind(name);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(mention_from_row).collect()
}

/// Aggregate a document's mentions per normalized software name
pub async fn group_mentions_by_document(
    pool: &SqlitePool,
    file_hal_id: &str,
) -> Result<Vec<GroupedMention>> {
    let mentions = get_document_software(pool, file_hal_id, None).await?;
    Ok(group_mentions(&mentions))
}

/// Record an author's verdict on every mention of `normalized_name` in a document
///
/// Returns the number of mentions updated; 0 means no such (document, name)
/// pair.
pub async fn update_verification(
    pool: &SqlitePool,
    file_hal_id: &str,
    normalized_name: &str,
    accepted: bool,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE software_mentions
        SET verification_by_author = ?
        WHERE normalized_name = ?
          AND id IN (
              SELECT e.mention_id
              FROM mention_edges e
              JOIN documents d ON d.id = e.document_id
              WHERE d.file_hal_id = ?
          )
        "#,
    )
    .bind(accepted)
    .bind(normalized_name)
    .bind(file_hal_id)
    .execute(pool)
    .await?;

    let updated = result.rows_affected();
    info!(
        file_hal_id = file_hal_id,
        name = normalized_name,
        accepted = accepted,
        updated = updated,
        "Verification updated"
    );
    Ok(updated)
}

/// Fetch one mention by id; failures are reported as "not found"
pub async fn get_mention(pool: &SqlitePool, mention_id: i64) -> Option<StoredMention> {
    let sql = format!(
        r#"
        SELECT {MENTION_COLUMNS}
        FROM software_mentions m
        JOIN mention_edges e ON e.mention_id = m.id
        JOIN documents d ON d.id = e.document_id
        WHERE m.id = ?
        "#
    );

    match sqlx::query(&sql).bind(mention_id).fetch_optional(pool).await {
        Ok(Some(row)) => match mention_from_row(&row) {
            Ok(mention) => Some(mention),
            Err(e) => {
                tracing::warn!(mention_id = mention_id, error = %e, "Stored mention is unreadable");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(mention_id = mention_id, error = %e, "Mention lookup failed");
            None
        }
    }
}

/// All mentions sharing a normalized name, across documents
pub async fn list_mentions_by_name(
    pool: &SqlitePool,
    normalized_name: &str,
) -> Result<Vec<StoredMention>> {
    let sql = format!(
        r#"
        SELECT {MENTION_COLUMNS}
        FROM software_mentions m
        JOIN mention_edges e ON e.mention_id = m.id
        JOIN documents d ON d.id = e.document_id
        WHERE m.normalized_name = ?
        ORDER BY m.id
        "#
    );

    let rows = sqlx::query(&sql).bind(normalized_name).fetch_all(pool).await?;
    rows.iter().map(mention_from_row).collect()
}

pub async fn count_mentions(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM software_mentions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_edges(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM mention_edges")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn mention_from_row(row: &SqliteRow) -> Result<StoredMention> {
    let contexts: String = row.get("contexts");
    let attributes: String = row.get("attributes");

    Ok(StoredMention {
        id: row.get("id"),
        file_hal_id: row.get("file_hal_id"),
        normalized_name: row.get("normalized_name"),
        software_type: row.get("software_type"),
        used_score: row.get("used_score"),
        created_score: row.get("created_score"),
        shared_score: row.get("shared_score"),
        contexts: serde_json::from_str(&contexts)?,
        verification_by_author: row.get("verification_by_author"),
        attributes: serde_json::from_str(&attributes)?,
    })
}

/// Drop structurally identical mentions, keeping first occurrences
fn dedup_mentions(raw_mentions: &[Value]) -> Vec<&Value> {
    let mut seen = HashSet::new();
    raw_mentions
        .iter()
        .filter(|value| seen.insert(canonical_key(value)))
        .collect()
}

/// Serialization with object keys sorted at every level
fn canonical_key(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|key| format!("{}:{}", Value::String(key.clone()), canonical_key(&map[key])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_key).collect();
            format!("[{}]", items.join(","))
        }
        scalar => scalar.to_string(),
    }
}
