//! HTTP API handlers for softmention-hub

pub mod auth;
pub mod blacklist;
pub mod documents;
pub mod health;
pub mod inbox;
pub mod ingest;
pub mod status;

pub use auth::{auth_middleware, API_KEY_HEADER};
pub use blacklist::blacklist_routes;
pub use documents::{document_routes, software_routes};
pub use health::health_routes;
pub use inbox::inbox_routes;
pub use ingest::ingest_routes;
pub use status::status_routes;
