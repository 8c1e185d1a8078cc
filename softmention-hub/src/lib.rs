//! softmention-hub library
//!
//! Tracks software mentions extracted from scholarly documents and exchanges
//! COAR Notify messages about them with peer repositories (HAL, Software
//! Heritage) and a visualization service.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod blacklist;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;

pub use blacklist::Blacklist;
pub use error::{ApiError, ApiResult};
use notify::{NotificationDispatcher, Provider, VisualizationClient};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Disallowed normalized software names
    pub blacklist: Arc<Blacklist>,
    /// Outbound COAR notifications
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Verdict forwarding
    pub visualization: Arc<VisualizationClient>,
    /// `x-api-key` value; `None` disables the guard
    pub api_key: Option<String>,
    /// Provider notified when none is detected from the identifier
    pub default_provider: Provider,
    /// Server startup time (for uptime)
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        blacklist: Blacklist,
        dispatcher: NotificationDispatcher,
        visualization: VisualizationClient,
    ) -> Self {
        Self {
            db,
            blacklist: Arc::new(blacklist),
            dispatcher: Arc::new(dispatcher),
            visualization: Arc::new(visualization),
            api_key: None,
            default_provider: Provider::Hal,
            startup_time: Utc::now(),
        }
    }

    /// Require `x-api-key` on protected routes (blank disables)
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_default_provider(mut self, provider: Provider) -> Self {
        self.default_provider = provider;
        self
    }
}

/// Build application router
///
/// Health, inbox and software read routes are public; everything else
/// requires the API key when one is configured.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = Router::new()
        .merge(api::status_routes())
        .merge(api::ingest_routes())
        .merge(api::document_routes())
        .merge(api::blacklist_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::inbox_routes())
        .merge(api::software_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
