//! Peer repositories and their inbox configuration
//!
//! Each provider resolves to one [`ProviderConfig`] with priority
//! ENV → TOML → compiled default, once at startup.

use serde::{Deserialize, Serialize};
use softmention_common::config::env_value;
use std::collections::HashMap;
use std::str::FromStr;

/// A peer repository that receives notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Hal,
    SoftwareHeritage,
    Unknown,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Hal => "hal",
            Provider::SoftwareHeritage => "software_heritage",
            Provider::Unknown => "unknown",
        }
    }

    /// Prefix of the environment variables overriding this provider's config
    fn env_prefix(&self) -> Option<&'static str> {
        match self {
            Provider::Hal => Some("SOFTMENTION_HAL"),
            Provider::SoftwareHeritage => Some("SOFTMENTION_SWH"),
            Provider::Unknown => None,
        }
    }

    /// Compiled defaults: (base_url, inbox_url)
    fn defaults(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Provider::Hal => Some((
                "https://inria.hal.science",
                "https://inbox-preprod.archives-ouvertes.fr/",
            )),
            Provider::SoftwareHeritage => Some((
                "https://archive.softwareheritage.org",
                "https://archive.softwareheritage.org/coar/inbox/",
            )),
            Provider::Unknown => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hal" => Ok(Provider::Hal),
            "software_heritage" | "softwareheritage" | "swh" => Ok(Provider::SoftwareHeritage),
            "unknown" => Ok(Provider::Unknown),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Guess the provider owning a document from its identifier or file name
///
/// `oai:hal:` and `swh:` prefixes are authoritative; otherwise file name
/// patterns are tried. Matching is case-insensitive.
pub fn detect_provider(identifier_or_filename: &str) -> Provider {
    let value = identifier_or_filename.trim().to_lowercase();

    if value.starts_with("oai:hal:") {
        return Provider::Hal;
    }
    if value.starts_with("swh:") {
        return Provider::SoftwareHeritage;
    }

    let file_name = value.rsplit(['/', '\\']).next().unwrap_or(value.as_str());

    if file_name.starts_with("hal-")
        || file_name.starts_with("hal_")
        || value.contains("hal.science")
        || value.contains("archives-ouvertes")
    {
        Provider::Hal
    } else if value.contains("softwareheritage")
        || file_name.starts_with("swh-")
        || file_name.starts_with("swh_")
    {
        Provider::SoftwareHeritage
    } else {
        Provider::Unknown
    }
}

/// Where and how to deliver notifications to one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Service identifier of the peer, used as `target.id`
    pub base_url: String,
    /// Inbox URL notifications are POSTed to
    pub inbox_url: String,
    /// Bearer token; no Authorization header when unset
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

/// Optional per-provider values from the TOML config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    pub base_url: Option<String>,
    pub inbox_url: Option<String>,
    pub token: Option<String>,
}

/// `[providers]` section of the TOML config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersToml {
    #[serde(default)]
    pub hal: ProviderSettings,
    #[serde(default, alias = "swh")]
    pub software_heritage: ProviderSettings,
}

impl ProvidersToml {
    fn settings(&self, provider: Provider) -> Option<&ProviderSettings> {
        match provider {
            Provider::Hal => Some(&self.hal),
            Provider::SoftwareHeritage => Some(&self.software_heritage),
            Provider::Unknown => None,
        }
    }
}

/// Resolve one provider's configuration
///
/// **Priority:** ENV (`SOFTMENTION_HAL_*` / `SOFTMENTION_SWH_*`) → TOML →
/// compiled default. `None` for [`Provider::Unknown`].
pub fn resolve_config(provider: Provider, toml: &ProvidersToml) -> Option<ProviderConfig> {
    let prefix = provider.env_prefix()?;
    let (default_base, default_inbox) = provider.defaults()?;
    let settings = toml.settings(provider)?;

    let pick = |suffix: &str, from_toml: &Option<String>| {
        env_value(&format!("{}_{}", prefix, suffix)).or_else(|| {
            from_toml
                .as_ref()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    };

    Some(ProviderConfig {
        base_url: pick("BASE_URL", &settings.base_url).unwrap_or_else(|| default_base.to_string()),
        inbox_url: pick("INBOX_URL", &settings.inbox_url)
            .unwrap_or_else(|| default_inbox.to_string()),
        token: pick("TOKEN", &settings.token),
    })
}

/// Resolved configuration of every known provider
#[derive(Debug, Clone, Default)]
pub struct ProviderDirectory {
    configs: HashMap<Provider, ProviderConfig>,
}

impl ProviderDirectory {
    /// Resolve HAL and Software Heritage from ENV/TOML/defaults
    pub fn resolve(toml: &ProvidersToml) -> Self {
        let mut configs = HashMap::new();
        for provider in [Provider::Hal, Provider::SoftwareHeritage] {
            if let Some(config) = resolve_config(provider, toml) {
                configs.insert(provider, config);
            }
        }
        Self { configs }
    }

    /// Add or replace one provider's configuration
    pub fn with(mut self, provider: Provider, config: ProviderConfig) -> Self {
        self.configs.insert(provider, config);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.configs.get(&provider)
    }
}
