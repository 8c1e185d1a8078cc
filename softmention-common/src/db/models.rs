//! Database models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A row of `documents`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub file_hal_id: String,
    pub created_at: String,
}

/// A row of `software_mentions`, joined with its owning document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMention {
    pub id: i64,
    pub file_hal_id: String,
    pub normalized_name: String,
    pub software_type: Option<String>,
    pub used_score: Option<f64>,
    pub created_score: Option<f64>,
    pub shared_score: Option<f64>,
    pub contexts: Vec<String>,
    /// `None` until an author accepts or rejects the mention
    pub verification_by_author: Option<bool>,
    /// Full mention as ingested (`software-name` renamed to `software_name`)
    pub attributes: Value,
}

/// A row of `received_notifications`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedNotification {
    pub id: i64,
    pub notification_id: Option<String>,
    pub notification_type: String,
    pub actor_id: Option<String>,
    pub payload: Value,
    pub received_at: String,
}
