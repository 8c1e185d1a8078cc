//! Storage status
//!
//! Reports whether the database answers and whether the graph tables exist,
//! i.e. whether uploads can be accepted.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use softmention_common::db::{table_exists, GRAPH_TABLES};
use std::collections::BTreeMap;
use tracing::warn;

use crate::db;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_connected: bool,
    pub tables: BTreeMap<String, bool>,
    pub can_upload: bool,
    pub documents: Option<i64>,
    pub mentions: Option<i64>,
    pub blacklist_terms: usize,
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let database_connected = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Database not reachable");
            false
        }
    };

    let mut tables = BTreeMap::new();
    if database_connected {
        for table in GRAPH_TABLES {
            let exists = table_exists(&state.db, table).await.unwrap_or(false);
            tables.insert(table.to_string(), exists);
        }
    }
    let can_upload = database_connected && !tables.is_empty() && tables.values().all(|&e| e);

    let (documents, mentions) = if can_upload {
        (
            db::count_documents(&state.db).await.ok(),
            db::count_mentions(&state.db).await.ok(),
        )
    } else {
        (None, None)
    };

    Json(StatusResponse {
        database_connected,
        tables,
        can_upload,
        documents,
        mentions,
        blacklist_terms: state.blacklist.len().await,
    })
}

pub fn status_routes() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}
