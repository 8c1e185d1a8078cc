//! Inbound COAR notifications
//!
//! Accept/Reject carry an author's verdict on a mention we offered for
//! review. The correlation keys sit in the echoed offer:
//! `object.object.id` (document, possibly `oai:HAL:`-prefixed) and
//! `object.object["sorg:citation"].name` (software name).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::db;
use crate::notify::Verdict;
use crate::AppState;

const HAL_OAI_PREFIX: &str = "oai:hal:";

/// What an inbound notification asks us to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAction {
    Accept,
    Reject,
    /// Any other activity type, kept for audit only
    Other(String),
}

impl InboundAction {
    /// Classify from the `type` member (string or array of strings)
    ///
    /// The first `Accept` or `Reject` entry wins. `None` when `type` is
    /// missing or not textual.
    pub fn from_type(value: &Value) -> Option<Self> {
        let types: Vec<&str> = match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => return None,
        };
        if types.is_empty() {
            return None;
        }

        for t in &types {
            match *t {
                "Accept" => return Some(InboundAction::Accept),
                "Reject" => return Some(InboundAction::Reject),
                _ => {}
            }
        }

        Some(InboundAction::Other(types.join(",")))
    }

    pub fn as_str(&self) -> &str {
        match self {
            InboundAction::Accept => "Accept",
            InboundAction::Reject => "Reject",
            InboundAction::Other(t) => t,
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            InboundAction::Accept => Some(Verdict::Accepted),
            InboundAction::Reject => Some(Verdict::Rejected),
            InboundAction::Other(_) => None,
        }
    }
}

/// Inbox processing errors
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Invalid notification format: {0}")]
    Malformed(String),

    #[error("Storage error: {0}")]
    Store(#[from] softmention_common::Error),
}

impl IntoResponse for InboxError {
    fn into_response(self) -> Response {
        let status = match &self {
            InboxError::Malformed(_) => StatusCode::BAD_REQUEST,
            InboxError::Store(e) => {
                tracing::error!(error = %e, "Inbox storage failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Acknowledgement returned with `202 Accepted`
#[derive(Debug, Clone, Serialize)]
pub struct InboxAck {
    pub status: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub actor: Option<String>,
    /// Mentions whose verification changed (Accept/Reject only)
    pub updated: u64,
}

/// Document id and software name targeted by an Accept/Reject
///
/// A leading `oai:HAL:` (any case) is stripped from the document id.
pub fn extract_correlation(payload: &Value) -> Result<(String, String), InboxError> {
    let offered = payload
        .get("object")
        .and_then(|o| o.get("object"))
        .ok_or_else(|| InboxError::Malformed("missing object.object".to_string()))?;

    let document_id = offered
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| InboxError::Malformed("missing object.object.id".to_string()))?;

    let software_name = offered
        .get("sorg:citation")
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            InboxError::Malformed("missing object.object[\"sorg:citation\"].name".to_string())
        })?;

    Ok((strip_hal_prefix(document_id).to_string(), software_name.to_string()))
}

fn strip_hal_prefix(id: &str) -> &str {
    match id.get(..HAL_OAI_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(HAL_OAI_PREFIX) => &id[HAL_OAI_PREFIX.len()..],
        _ => id,
    }
}

/// Actor id, whether `actor` is an object or a bare IRI
fn actor_id(payload: &Value) -> Option<String> {
    match payload.get("actor")? {
        Value::String(id) => Some(id.clone()),
        actor => actor.get("id").and_then(Value::as_str).map(str::to_string),
    }
}

/// Process one inbound notification
///
/// Malformed Accept/Reject payloads are rejected before anything is stored.
/// The visualization forward is best-effort.
pub async fn handle_notification(state: &AppState, payload: Value) -> Result<InboxAck, InboxError> {
    if !payload.is_object() {
        return Err(InboxError::Malformed("body is not a JSON object".to_string()));
    }

    let action = payload
        .get("type")
        .and_then(InboundAction::from_type)
        .ok_or_else(|| InboxError::Malformed("missing type".to_string()))?;
    let actor = actor_id(&payload);

    let mut updated = 0;
    if let Some(verdict) = action.verdict() {
        let (document_id, software_name) = extract_correlation(&payload)?;

        updated = db::update_verification(
            &state.db,
            &document_id,
            &software_name,
            verdict.is_accepted(),
        )
        .await?;

        if updated == 0 {
            warn!(
                document_id = %document_id,
                software = %software_name,
                "Verdict received for unknown mention"
            );
        }

        db::record_received_notification(&state.db, action.as_str(), actor.as_deref(), &payload)
            .await?;

        if let Err(e) = state
            .visualization
            .forward(verdict, &document_id, &software_name)
            .await
        {
            warn!(
                document_id = %document_id,
                software = %software_name,
                error = %e,
                "Visualization forward failed"
            );
        }
    } else {
        db::record_received_notification(&state.db, action.as_str(), actor.as_deref(), &payload)
            .await?;
    }

    info!(
        notification_type = action.as_str(),
        actor = actor.as_deref().unwrap_or("-"),
        updated = updated,
        "Notification received"
    );

    Ok(InboxAck {
        status: "ok".to_string(),
        notification_type: action.as_str().to_string(),
        actor,
        updated,
    })
}
