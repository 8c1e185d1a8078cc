//! Document ingestion endpoints
//!
//! - `POST /insert`: multipart upload, part `file` holds the extraction
//!   result; the identifier is the `file_hal_id` part or the file name
//! - `POST /api/documents/:id/mentions`: JSON body `{"mentions": [...]}`
//!
//! Both answer 201 for a new document and 409 when it already exists.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::services::{document_id_from_filename, ingest_document, parse_upload, IngestReport, IngestStatus};
use crate::AppState;

/// Body of `POST /api/documents/:id/mentions`
#[derive(Debug, Deserialize)]
pub struct MentionsRequest {
    #[serde(default)]
    pub mentions: Vec<Value>,
}

/// POST /insert
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<IngestReport>)> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut explicit_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("file_hal_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file_hal_id: {}", e)))?;
                explicit_id = Some(text.trim().to_string()).filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("No file part".to_string()))?;

    let file_hal_id = explicit_id
        .or_else(|| filename.as_deref().and_then(document_id_from_filename))
        .ok_or_else(|| ApiError::BadRequest("No document identifier".to_string()))?;

    let mentions = parse_upload(&bytes)?;
    info!(
        file_hal_id = %file_hal_id,
        filename = filename.as_deref().unwrap_or("-"),
        mentions = mentions.len(),
        "Upload received"
    );

    respond(ingest_document(&state, &file_hal_id, &mentions).await?)
}

/// POST /api/documents/:id/mentions
pub async fn insert_document_mentions(
    State(state): State<AppState>,
    Path(file_hal_id): Path<String>,
    Json(request): Json<MentionsRequest>,
) -> ApiResult<(StatusCode, Json<IngestReport>)> {
    respond(ingest_document(&state, &file_hal_id, &request.mentions).await?)
}

fn respond(report: IngestReport) -> ApiResult<(StatusCode, Json<IngestReport>)> {
    let status = match report.status {
        IngestStatus::Inserted => StatusCode::CREATED,
        IngestStatus::AlreadyExists => StatusCode::CONFLICT,
    };
    Ok((status, Json(report)))
}

pub fn ingest_routes() -> Router<AppState> {
    Router::new()
        .route("/insert", post(upload_file))
        .route("/api/documents/:id/mentions", post(insert_document_mentions))
}
