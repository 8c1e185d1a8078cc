//! Document and software read endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use softmention_common::db::{DocumentRecord, StoredMention};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::GroupedMention;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SoftwareFilter {
    /// Restrict to one normalized name
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// GET /api/documents/status
pub async fn documents_status(State(state): State<AppState>) -> ApiResult<Json<CountResponse>> {
    let count = db::count_documents(&state.db).await?;
    Ok(Json(CountResponse { count }))
}

/// GET /api/documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    Path(file_hal_id): Path<String>,
) -> ApiResult<Json<DocumentRecord>> {
    db::find_document(&state.db, &file_hal_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Document {}", file_hal_id)))
}

/// GET /api/documents/:id/softwares
pub async fn get_document_softwares(
    State(state): State<AppState>,
    Path(file_hal_id): Path<String>,
    Query(filter): Query<SoftwareFilter>,
) -> ApiResult<Json<Vec<StoredMention>>> {
    if !db::document_exists(&state.db, &file_hal_id).await? {
        return Err(ApiError::NotFound(format!("Document {}", file_hal_id)));
    }

    let name = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let mentions = db::get_document_software(&state.db, &file_hal_id, name).await?;
    Ok(Json(mentions))
}

/// GET /api/documents/:id/softwares/:name
///
/// Path form of the `?name=` filter. `grouped` is taken by the route below.
pub async fn get_document_software_by_name(
    State(state): State<AppState>,
    Path((file_hal_id, name)): Path<(String, String)>,
) -> ApiResult<Json<Vec<StoredMention>>> {
    if !db::document_exists(&state.db, &file_hal_id).await? {
        return Err(ApiError::NotFound(format!("Document {}", file_hal_id)));
    }

    let mentions = db::get_document_software(&state.db, &file_hal_id, Some(name.trim())).await?;
    Ok(Json(mentions))
}

/// GET /api/documents/:id/softwares/grouped
pub async fn get_grouped_softwares(
    State(state): State<AppState>,
    Path(file_hal_id): Path<String>,
) -> ApiResult<Json<Vec<GroupedMention>>> {
    if !db::document_exists(&state.db, &file_hal_id).await? {
        return Err(ApiError::NotFound(format!("Document {}", file_hal_id)));
    }

    Ok(Json(db::group_mentions_by_document(&state.db, &file_hal_id).await?))
}

/// GET /api/softwares/status
pub async fn softwares_status(State(state): State<AppState>) -> ApiResult<Json<CountResponse>> {
    let count = db::count_mentions(&state.db).await?;
    Ok(Json(CountResponse { count }))
}

/// GET /api/software/:name
pub async fn get_software_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<StoredMention>>> {
    Ok(Json(db::list_mentions_by_name(&state.db, &name).await?))
}

/// GET /api/software_mention/:id
pub async fn get_software_mention(
    State(state): State<AppState>,
    Path(mention_id): Path<i64>,
) -> ApiResult<Json<StoredMention>> {
    db::get_mention(&state.db, mention_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Software mention {}", mention_id)))
}

/// Protected document reads
pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/api/documents/status", get(documents_status))
        .route("/api/documents/:id", get(get_document))
        .route("/api/documents/:id/softwares", get(get_document_softwares))
        .route("/api/documents/:id/softwares/grouped", get(get_grouped_softwares))
        .route("/api/documents/:id/softwares/:name", get(get_document_software_by_name))
}

/// Public software reads
pub fn software_routes() -> Router<AppState> {
    Router::new()
        .route("/api/softwares/status", get(softwares_status))
        .route("/api/software/:name", get(get_software_by_name))
        .route("/api/software_mention/:id", get(get_software_mention))
}
