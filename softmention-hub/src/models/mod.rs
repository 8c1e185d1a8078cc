//! Data models for softmention-hub
//!
//! Ingestion input (mention extraction results) and the per-document
//! aggregation used to build outbound notifications.

pub mod mention;

pub use mention::{
    group_mentions, AttributeScores, GroupedMention, MentionAttribute, MentionContext,
    RawMention,
};
