//! Ingestion of mention-extraction results
//!
//! Store first, then notify the document's provider about every grouped
//! mention. A document that was already ingested is left untouched and
//! triggers no notifications.

use serde::Serialize;
use serde_json::Value;
use softmention_common::{Error, Result};
use tracing::{info, warn};

use crate::db::{self, InsertOutcome};
use crate::notify::{detect_provider, DispatchSummary, Provider};
use crate::AppState;

/// Ingestion result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Inserted,
    AlreadyExists,
}

/// Outcome of [`ingest_document`]
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub status: IngestStatus,
    pub file_hal_id: String,
    pub stored: usize,
    pub duplicates: usize,
    pub blacklisted: usize,
    /// `None` when nothing was sent (already existing document)
    pub notifications: Option<DispatchSummary>,
}

/// Extract the mention list from an uploaded extraction result
///
/// Accepts `{"mentions": [...]}` (other members ignored) or a bare array.
/// An object without `mentions` yields an empty list.
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::InvalidInput(format!("upload is not valid JSON: {}", e)))?;

    match value {
        Value::Array(mentions) => Ok(mentions),
        Value::Object(mut map) => match map.remove("mentions") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(mentions)) => Ok(mentions),
            Some(_) => Err(Error::InvalidInput("`mentions` must be an array".to_string())),
        },
        _ => Err(Error::InvalidInput(
            "upload must be a JSON object or array".to_string(),
        )),
    }
}

/// Document identifier from an uploaded file name
///
/// Directory components are dropped, then a `.software.json` or `.json`
/// suffix. `None` if nothing is left.
pub fn document_id_from_filename(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename).trim();
    let stem = name
        .strip_suffix(".software.json")
        .or_else(|| name.strip_suffix(".json"))
        .unwrap_or(name);

    Some(stem.to_string()).filter(|s| !s.is_empty())
}

/// Store a document's mentions and notify its provider
///
/// Validation and storage errors propagate; delivery failures only show up
/// in the returned [`DispatchSummary`].
pub async fn ingest_document(
    state: &AppState,
    file_hal_id: &str,
    mentions: &[Value],
) -> Result<IngestReport> {
    let outcome = db::insert_mentions(&state.db, &state.blacklist, file_hal_id, mentions).await?;

    let (stored, duplicates, blacklisted) = match outcome {
        InsertOutcome::AlreadyExists => {
            return Ok(IngestReport {
                status: IngestStatus::AlreadyExists,
                file_hal_id: file_hal_id.to_string(),
                stored: 0,
                duplicates: 0,
                blacklisted: 0,
                notifications: None,
            });
        }
        InsertOutcome::Inserted {
            stored,
            duplicates,
            blacklisted,
            ..
        } => (stored, duplicates, blacklisted),
    };

    let provider = match detect_provider(file_hal_id) {
        Provider::Unknown => {
            info!(
                file_hal_id = file_hal_id,
                provider = %state.default_provider,
                "Provider not detected, using default"
            );
            state.default_provider
        }
        detected => detected,
    };

    let notifications = match db::group_mentions_by_document(&state.db, file_hal_id).await {
        Ok(grouped) => Some(state.dispatcher.dispatch(file_hal_id, &grouped, provider).await),
        Err(e) => {
            warn!(file_hal_id = file_hal_id, error = %e, "Grouping failed, notifications skipped");
            None
        }
    };

    Ok(IngestReport {
        status: IngestStatus::Inserted,
        file_hal_id: file_hal_id.to_string(),
        stored,
        duplicates,
        blacklisted,
        notifications,
    })
}
