//! Software mention models
//!
//! A mention extraction result carries one entry per software reference found
//! in a document. Each entry is validated into a [`RawMention`] before storage;
//! stored mentions are later grouped by normalized name into
//! [`GroupedMention`]s for notification.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use softmention_common::db::StoredMention;

/// One extracted software mention as uploaded
#[derive(Debug, Clone, Deserialize)]
pub struct RawMention {
    #[serde(rename = "software-name", alias = "software_name")]
    pub software_name: SoftwareName,

    #[serde(rename = "software-type", alias = "software_type", default)]
    pub software_type: Option<String>,

    #[serde(rename = "documentContextAttributes", default)]
    pub document_context_attributes: Option<DocumentContextAttributes>,

    #[serde(default)]
    pub context: Option<MentionContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoftwareName {
    #[serde(rename = "normalizedForm")]
    pub normalized_form: String,
}

/// Per-usage-category confidence scores
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentContextAttributes {
    #[serde(default)]
    pub used: Option<AttributeScore>,
    #[serde(default)]
    pub created: Option<AttributeScore>,
    #[serde(default)]
    pub shared: Option<AttributeScore>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeScore {
    #[serde(default)]
    pub score: Option<f64>,
}

/// Textual context of a mention: extractors emit a single sentence, but a
/// list is accepted too
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MentionContext {
    Single(String),
    Many(Vec<String>),
}

impl MentionContext {
    pub fn into_contexts(self) -> Vec<String> {
        match self {
            MentionContext::Single(text) => vec![text],
            MentionContext::Many(texts) => texts,
        }
    }
}

impl RawMention {
    /// Validate one uploaded mention
    ///
    /// The only required field is `software-name.normalizedForm`, which must
    /// be a non-blank string.
    pub fn parse(value: &Value) -> Result<Self, String> {
        let mention: RawMention = serde_json::from_value(value.clone())
            .map_err(|e| format!("invalid mention: {}", e))?;

        if mention.software_name.normalized_form.trim().is_empty() {
            return Err("invalid mention: software-name.normalizedForm is empty".to_string());
        }

        Ok(mention)
    }

    pub fn normalized_name(&self) -> &str {
        &self.software_name.normalized_form
    }

    pub fn scores(&self) -> AttributeScores {
        let attrs = self.document_context_attributes.clone().unwrap_or_default();
        AttributeScores {
            used: attrs.used.and_then(|a| a.score),
            created: attrs.created.and_then(|a| a.score),
            shared: attrs.shared.and_then(|a| a.score),
        }
    }

    pub fn contexts(&self) -> Vec<String> {
        self.context
            .clone()
            .map(MentionContext::into_contexts)
            .unwrap_or_default()
    }

    /// The uploaded JSON with hyphenated keys renamed for storage
    pub fn stored_attributes(value: &Value) -> Value {
        let mut stored = value.clone();
        if let Value::Object(map) = &mut stored {
            if let Some(name) = map.remove("software-name") {
                map.insert("software_name".to_string(), name);
            }
            if let Some(kind) = map.remove("software-type") {
                map.insert("software_type".to_string(), kind);
            }
        }
        stored
    }
}

/// Usage category of a mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionAttribute {
    Used,
    Created,
    Shared,
}

impl MentionAttribute {
    /// Fixed precedence used to break ties between equal maximum scores
    pub const PRECEDENCE: [MentionAttribute; 3] = [
        MentionAttribute::Used,
        MentionAttribute::Created,
        MentionAttribute::Shared,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MentionAttribute::Used => "used",
            MentionAttribute::Created => "created",
            MentionAttribute::Shared => "shared",
        }
    }
}

impl std::fmt::Display for MentionAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores of the three usage categories; `None` when absent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttributeScores {
    pub used: Option<f64>,
    pub created: Option<f64>,
    pub shared: Option<f64>,
}

impl AttributeScores {
    pub fn get(&self, attribute: MentionAttribute) -> Option<f64> {
        match attribute {
            MentionAttribute::Used => self.used,
            MentionAttribute::Created => self.created,
            MentionAttribute::Shared => self.shared,
        }
    }

    /// Per-attribute maximum of two score sets
    pub fn max_with(&self, other: &AttributeScores) -> AttributeScores {
        fn max_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
            match (a, b) {
                (Some(x), Some(y)) => Some(x.max(y)),
                (x, None) => x,
                (None, y) => y,
            }
        }

        AttributeScores {
            used: max_opt(self.used, other.used),
            created: max_opt(self.created, other.created),
            shared: max_opt(self.shared, other.shared),
        }
    }

    /// Attribute holding the overall maximum score
    ///
    /// Ties resolve to the first attribute in [`MentionAttribute::PRECEDENCE`].
    /// `None` when no attribute carries a score.
    pub fn max_attribute(&self) -> Option<MentionAttribute> {
        let overall = MentionAttribute::PRECEDENCE
            .iter()
            .filter_map(|attr| self.get(*attr))
            .fold(None, |best: Option<f64>, score| {
                Some(best.map_or(score, |b| b.max(score)))
            })?;

        MentionAttribute::PRECEDENCE
            .into_iter()
            .find(|attr| self.get(*attr) == Some(overall))
    }
}

impl From<&StoredMention> for AttributeScores {
    fn from(mention: &StoredMention) -> Self {
        AttributeScores {
            used: mention.used_score,
            created: mention.created_score,
            shared: mention.shared_score,
        }
    }
}

/// Mentions of one software within one document, aggregated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedMention {
    #[serde(rename = "softwareName")]
    pub software_name: String,
    #[serde(rename = "maxDocumentAttribute")]
    pub max_document_attribute: Option<MentionAttribute>,
    pub contexts: Vec<String>,
}

/// Group stored mentions by normalized name
///
/// Groups come back sorted by name. Contexts keep the order of the input
/// mentions.
pub fn group_mentions(mentions: &[StoredMention]) -> Vec<GroupedMention> {
    let mut groups: BTreeMap<&str, (AttributeScores, Vec<String>)> = BTreeMap::new();

    for mention in mentions {
        let entry = groups
            .entry(mention.normalized_name.as_str())
            .or_insert_with(|| (AttributeScores::default(), Vec::new()));
        entry.0 = entry.0.max_with(&AttributeScores::from(mention));
        entry.1.extend(mention.contexts.iter().cloned());
    }

    groups
        .into_iter()
        .map(|(name, (scores, contexts))| GroupedMention {
            software_name: name.to_string(),
            max_document_attribute: scores.max_attribute(),
            contexts,
        })
        .collect()
}
