//! Blacklist administration endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::blacklist::{BlacklistStats, ImportSummary};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct TermRequest {
    pub term: String,
}

#[derive(Debug, Serialize)]
pub struct TermResponse {
    pub term: String,
    /// False when the term was already present (add) or absent (remove)
    pub changed: bool,
    pub total_terms: usize,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub total_terms: usize,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub csv: String,
    #[serde(default)]
    pub overwrite: bool,
}

/// GET /api/blacklist?q=&limit=
pub async fn search_blacklist(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let results = state.blacklist.search(&params.q, limit).await;

    Json(SearchResponse {
        query: params.q,
        count: results.len(),
        results,
    })
}

/// GET /api/blacklist/stats
pub async fn blacklist_stats(State(state): State<AppState>) -> Json<BlacklistStats> {
    Json(state.blacklist.stats().await)
}

/// POST /api/blacklist
pub async fn add_term(
    State(state): State<AppState>,
    Json(request): Json<TermRequest>,
) -> ApiResult<(StatusCode, Json<TermResponse>)> {
    let term = request.term.trim().to_string();
    if term.is_empty() {
        return Err(ApiError::BadRequest("term must not be empty".to_string()));
    }

    let changed = state.blacklist.add(&term).await?;
    let status = if changed { StatusCode::CREATED } else { StatusCode::OK };

    Ok((
        status,
        Json(TermResponse {
            term,
            changed,
            total_terms: state.blacklist.len().await,
        }),
    ))
}

/// DELETE /api/blacklist/:term
pub async fn remove_term(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> ApiResult<Json<TermResponse>> {
    if !state.blacklist.remove(&term).await? {
        return Err(ApiError::NotFound(format!("Blacklist term '{}'", term)));
    }

    Ok(Json(TermResponse {
        term,
        changed: true,
        total_terms: state.blacklist.len().await,
    }))
}

/// POST /api/blacklist/reload
pub async fn reload_blacklist(State(state): State<AppState>) -> ApiResult<Json<ReloadResponse>> {
    let total_terms = state.blacklist.reload().await?;
    Ok(Json(ReloadResponse { total_terms }))
}

/// GET /api/blacklist/export
pub async fn export_blacklist(State(state): State<AppState>) -> impl IntoResponse {
    let csv = state.blacklist.export().await;
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"blacklist.csv\""),
        ],
        csv,
    )
}

/// POST /api/blacklist/import
pub async fn import_blacklist(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportSummary>> {
    let summary = state.blacklist.import(&request.csv, request.overwrite).await?;
    info!(
        imported = summary.imported,
        total = summary.total,
        overwrite = summary.overwrite,
        "Blacklist imported via API"
    );
    Ok(Json(summary))
}

pub fn blacklist_routes() -> Router<AppState> {
    Router::new()
        .route("/api/blacklist", get(search_blacklist).post(add_term))
        .route("/api/blacklist/stats", get(blacklist_stats))
        .route("/api/blacklist/reload", post(reload_blacklist))
        .route("/api/blacklist/export", get(export_blacklist))
        .route("/api/blacklist/import", post(import_blacklist))
        .route("/api/blacklist/:term", delete(remove_term))
}
