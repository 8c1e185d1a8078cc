//! COAR Notify inbox endpoints
//!
//! - `POST /inbox`: receive a notification (202 on success)
//! - `GET /inbox`: describe what this inbox accepts
//! - `GET /notifications`: received notifications, newest first

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use softmention_common::db::ReceivedNotification;

use crate::db;
use crate::error::ApiResult;
use crate::services::{handle_notification, InboxAck, InboxError};
use crate::AppState;

const DEFAULT_NOTIFICATION_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
    pub limit: Option<i64>,
}

/// POST /inbox
///
/// The body is read as JSON regardless of Content-Type, since peers send
/// `application/ld+json`.
pub async fn receive_notification(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<(StatusCode, Json<InboxAck>), InboxError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| InboxError::Malformed(format!("invalid JSON: {}", e)))?;

    let ack = handle_notification(&state, payload).await?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}

/// GET /inbox
pub async fn inbox_description(State(state): State<AppState>) -> Json<Value> {
    let identity = state.dispatcher.identity();

    Json(json!({
        "title": "COAR Notify Inbox",
        "description": "Receives COAR Notify notifications for software mention verification",
        "version": env!("CARGO_PKG_VERSION"),
        "service": {
            "id": identity.id,
            "name": identity.name,
            "inbox": identity.inbox,
        },
        "endpoints": {
            "POST": {
                "url": "/inbox",
                "content_type": "application/ld+json",
                "description": "Send a COAR notification to verify or reject a software mention"
            },
            "GET": {
                "url": "/inbox",
                "description": "This description"
            }
        },
        "supported_notification_types": [
            {
                "type": "Accept",
                "description": "Accepts a software mention as verified by the author",
                "effect": "verification_by_author = true"
            },
            {
                "type": "Reject",
                "description": "Rejects a software mention",
                "effect": "verification_by_author = false"
            }
        ],
        "request_format": {
            "required_fields": ["type", "actor", "object"],
            "correlation": {
                "document": "object.object.id (an oai:HAL: prefix is stripped)",
                "software": "object.object[\"sorg:citation\"].name"
            },
            "example_accept": {
                "type": "Accept",
                "actor": { "type": "Person", "id": "https://orcid.org/0000-0000-0000-0000" },
                "object": {
                    "type": "Offer",
                    "id": "urn:uuid:12345678-1234-1234-1234-123456789012",
                    "object": {
                        "type": "Document",
                        "id": "oai:HAL:hal-01478788",
                        "sorg:citation": { "name": "SoftwareName", "type": "Software" }
                    }
                }
            }
        },
        "responses": {
            "202": { "status": "ok", "type": "Accept", "actor": "https://orcid.org/0000-0000-0000-0000", "updated": 1 },
            "400": { "error": "Invalid notification format: ..." }
        },
        "view_notifications": { "url": "/notifications", "method": "GET" }
    }))
}

/// GET /notifications?limit=
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(params): Query<NotificationParams>,
) -> ApiResult<Json<Vec<ReceivedNotification>>> {
    let limit = params.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT).clamp(1, 1000);
    Ok(Json(db::list_received_notifications(&state.db, limit).await?))
}

pub fn inbox_routes() -> Router<AppState> {
    Router::new()
        .route("/inbox", get(inbox_description).post(receive_notification))
        .route("/notifications", get(list_notifications))
}
