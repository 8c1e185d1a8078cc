//! COAR Notify exchange with peer repositories

pub mod dispatcher;
pub mod payload;
pub mod provider;
pub mod visualization;

pub use dispatcher::{DeliveryError, DispatchSummary, NotificationDispatcher, JSON_LD};
pub use payload::{
    build_action_review, build_relationship_announce, ActionReviewPayload, NotificationKind,
    NotificationPayload, OutboundNotification, RelationshipAnnouncePayload, ServiceIdentity,
};
pub use provider::{
    detect_provider, resolve_config, Provider, ProviderConfig, ProviderDirectory, ProvidersToml,
};
pub use visualization::{Verdict, VisualizationClient};
