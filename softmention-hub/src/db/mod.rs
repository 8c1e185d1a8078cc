//! Mention graph store
//!
//! Documents, software mentions and the edges between them live in SQLite
//! (see `softmention_common::db::init`). Functions here take a pool and
//! perform one logical operation each.

pub mod documents;
pub mod mentions;
pub mod notifications;

pub use documents::{count_documents, document_exists, find_document};
pub use mentions::{
    count_edges, count_mentions, get_document_software, get_mention,
    group_mentions_by_document, insert_mentions, list_mentions_by_name, update_verification,
    InsertOutcome,
};
pub use notifications::{list_received_notifications, record_received_notification};
