//! COAR Notify payloads
//!
//! Both supported notifications share the ActivityStreams envelope
//! (`@context`, `id`, `type`, `actor`, `origin`, `target`, `object`) and
//! differ in their `object`:
//!
//! - [`ActionReviewPayload`]: an Offer asking the repository to review a
//!   software citation found in a document
//! - [`RelationshipAnnouncePayload`]: an Announce stating that a document
//!   cites a piece of software
//!
//! Builders are pure; every payload gets a fresh `urn:uuid:` identifier.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::provider::ProviderConfig;
use crate::models::{GroupedMention, MentionAttribute};

pub const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";
pub const COAR_NOTIFY_CONTEXT: &str = "https://purl.org/coar/notify";
pub const CODEMETA_CONTEXT: &str = "https://doi.org/10.5063/schema/codemeta-2.0";
pub const CITATION_RELATIONSHIP: &str = "https://w3id.org/codemeta/3.0#citation";

/// This service, as it appears in `actor` and `origin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub id: String,
    pub name: String,
    /// Our own inbox, where peers send Accept/Reject
    pub inbox: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Actor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub inbox: String,
}

impl ServiceRef {
    fn service(id: &str, inbox: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: "Service".to_string(),
            inbox: inbox.to_string(),
        }
    }
}

/// Which notification a payload is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ActionReview,
    RelationshipAnnounce,
}

/// Object carried by an [`Envelope`]
pub trait PayloadObject: Serialize {
    const KIND: NotificationKind;
    const ACTIVITY_TYPES: [&'static str; 2];
}

/// ActivityStreams envelope shared by all outbound notifications
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<O> {
    #[serde(rename = "@context")]
    pub jsonld_context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub activity_types: Vec<String>,
    pub actor: Actor,
    pub origin: ServiceRef,
    pub target: ServiceRef,
    pub object: O,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ArticleContext>,
}

impl<O: PayloadObject> Envelope<O> {
    fn new(
        identity: &ServiceIdentity,
        target: &ProviderConfig,
        object: O,
        context: Option<ArticleContext>,
    ) -> Self {
        Self {
            jsonld_context: vec![
                ACTIVITY_STREAMS_CONTEXT.to_string(),
                COAR_NOTIFY_CONTEXT.to_string(),
            ],
            id: new_urn(),
            activity_types: O::ACTIVITY_TYPES.iter().map(|t| t.to_string()).collect(),
            actor: Actor {
                id: identity.id.clone(),
                kind: "Service".to_string(),
                name: identity.name.clone(),
            },
            origin: ServiceRef::service(&identity.id, &identity.inbox),
            target: ServiceRef::service(&target.base_url, &target.inbox_url),
            object,
            context,
        }
    }
}

/// `sorg:citation` of a review offer (codemeta SoftwareSourceCode)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftwareCitation {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(rename = "codeRepository")]
    pub code_repository: Option<String>,
    #[serde(rename = "referencePublication")]
    pub reference_publication: Option<String>,
}

/// Object of an ActionReview offer: the document and the cited software
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewObject {
    /// Document identifier
    pub id: String,
    #[serde(rename = "ietf:cite-as")]
    pub cite_as: Option<String>,
    #[serde(rename = "sorg:citation")]
    pub citation: SoftwareCitation,
    #[serde(rename = "mentionType")]
    pub mention_type: Option<MentionAttribute>,
    #[serde(rename = "mentionContext")]
    pub mention_context: Vec<String>,
}

impl PayloadObject for ReviewObject {
    const KIND: NotificationKind = NotificationKind::ActionReview;
    const ACTIVITY_TYPES: [&'static str; 2] = ["Offer", "coar-notify:ReviewAction"];
}

/// Object of a RelationshipAnnounce: document → software triple
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "as:subject")]
    pub subject: String,
    #[serde(rename = "as:relationship")]
    pub relationship: String,
    #[serde(rename = "as:object")]
    pub object: String,
    #[serde(rename = "as:name")]
    pub name: String,
}

impl PayloadObject for RelationshipObject {
    const KIND: NotificationKind = NotificationKind::RelationshipAnnounce;
    const ACTIVITY_TYPES: [&'static str; 2] = ["Announce", "coar-notify:RelationshipAction"];
}

/// Landing page of the citing article (`context` of an announce)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleContext {
    pub id: String,
    #[serde(rename = "ietf:cite-as")]
    pub cite_as: Option<String>,
    #[serde(rename = "ietf:item")]
    pub item: ArticleItem,
    #[serde(rename = "type")]
    pub kind: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleItem {
    pub id: String,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    #[serde(rename = "type")]
    pub kind: Vec<String>,
}

pub type ActionReviewPayload = Envelope<ReviewObject>;
pub type RelationshipAnnouncePayload = Envelope<RelationshipObject>;

/// Common capability of outbound notifications
pub trait NotificationPayload {
    /// The notification's `urn:uuid:` identifier
    fn id(&self) -> &str;
    fn kind(&self) -> NotificationKind;
    fn target_inbox(&self) -> &str;
    fn to_jsonld(&self) -> serde_json::Result<Value>;
}

impl<O: PayloadObject> NotificationPayload for Envelope<O> {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> NotificationKind {
        O::KIND
    }

    fn target_inbox(&self) -> &str {
        &self.target.inbox
    }

    fn to_jsonld(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Any notification the dispatcher can send
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundNotification {
    ActionReview(ActionReviewPayload),
    RelationshipAnnounce(RelationshipAnnouncePayload),
}

impl NotificationPayload for OutboundNotification {
    fn id(&self) -> &str {
        match self {
            OutboundNotification::ActionReview(p) => p.id(),
            OutboundNotification::RelationshipAnnounce(p) => p.id(),
        }
    }

    fn kind(&self) -> NotificationKind {
        match self {
            OutboundNotification::ActionReview(p) => p.kind(),
            OutboundNotification::RelationshipAnnounce(p) => p.kind(),
        }
    }

    fn target_inbox(&self) -> &str {
        match self {
            OutboundNotification::ActionReview(p) => p.target_inbox(),
            OutboundNotification::RelationshipAnnounce(p) => p.target_inbox(),
        }
    }

    fn to_jsonld(&self) -> serde_json::Result<Value> {
        match self {
            OutboundNotification::ActionReview(p) => p.to_jsonld(),
            OutboundNotification::RelationshipAnnounce(p) => p.to_jsonld(),
        }
    }
}

/// Offer a software citation found in a document for review
pub fn build_action_review(
    identity: &ServiceIdentity,
    target: &ProviderConfig,
    document_id: &str,
    mention: &GroupedMention,
) -> ActionReviewPayload {
    let object = ReviewObject {
        id: document_id.to_string(),
        cite_as: None,
        citation: SoftwareCitation {
            context: CODEMETA_CONTEXT.to_string(),
            kind: "SoftwareSourceCode".to_string(),
            name: mention.software_name.clone(),
            code_repository: None,
            reference_publication: None,
        },
        mention_type: mention.max_document_attribute,
        mention_context: mention.contexts.clone(),
    };

    Envelope::new(identity, target, object, None)
}

/// Announce that a document cites a piece of software
///
/// `as:object` is the software repository when known, its name otherwise.
pub fn build_relationship_announce(
    identity: &ServiceIdentity,
    target: &ProviderConfig,
    document_id: &str,
    software_name: &str,
    software_repo: Option<&str>,
) -> RelationshipAnnouncePayload {
    let object = RelationshipObject {
        id: new_urn(),
        kind: "Relationship".to_string(),
        subject: document_id.to_string(),
        relationship: CITATION_RELATIONSHIP.to_string(),
        object: software_repo.unwrap_or(software_name).to_string(),
        name: software_name.to_string(),
    };

    let context = ArticleContext {
        id: document_id.to_string(),
        cite_as: None,
        item: ArticleItem {
            id: document_id.to_string(),
            media_type: "application/pdf".to_string(),
            kind: vec!["Object".to_string(), "sorg:ScholarlyArticle".to_string()],
        },
        kind: vec!["Page".to_string(), "sorg:AboutPage".to_string()],
    };

    Envelope::new(identity, target, object, Some(context))
}

fn new_urn() -> String {
    Uuid::new_v4().urn().to_string()
}
