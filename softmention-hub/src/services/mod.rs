//! Workflows spanning the store and the notification exchange

pub mod inbox;
pub mod ingest;

pub use inbox::{handle_notification, InboundAction, InboxAck, InboxError};
pub use ingest::{document_id_from_filename, ingest_document, parse_upload, IngestReport, IngestStatus};
