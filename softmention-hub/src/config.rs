//! Configuration for softmention-hub
//!
//! Values come from `softmention-hub.toml` (all keys optional) and are then
//! overridden by `SOFTMENTION_*` environment variables.
//!
//! **Priority:** CLI → ENV → TOML → compiled default

use serde::Deserialize;
use softmention_common::config::{env_value, BLACKLIST_FILE, DATABASE_FILE};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::notify::{Provider, ProvidersToml, ServiceIdentity};

pub const MODULE_NAME: &str = "softmention-hub";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5500";
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

/// `softmention-hub.toml` contents
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: String,
    /// Defaults to `<root>/softmention.db`
    pub database_path: Option<PathBuf>,
    /// Defaults to `<root>/blacklist.csv`
    pub blacklist_path: Option<PathBuf>,
    /// Empty or unset disables the `x-api-key` guard
    pub api_key: Option<String>,
    pub notify_timeout_secs: u64,
    pub visualization_url: Option<String>,
    /// Provider used when none can be detected from the document identifier
    pub default_provider: Provider,
    pub service: ServiceSection,
    pub providers: ProvidersToml,
}

/// `[service]`: how this hub identifies itself in outbound notifications
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub id: String,
    pub name: String,
    pub inbox: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            id: "http://localhost:5500".to_string(),
            name: "Software Mentions".to_string(),
            inbox: "http://localhost:5500/inbox".to_string(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            database_path: None,
            blacklist_path: None,
            api_key: None,
            notify_timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
            visualization_url: None,
            default_provider: Provider::Hal,
            service: ServiceSection::default(),
            providers: ProvidersToml::default(),
        }
    }
}

impl HubConfig {
    /// Apply `SOFTMENTION_*` environment overrides
    ///
    /// Provider URLs and tokens are resolved separately by
    /// [`crate::notify::ProviderDirectory::resolve`].
    pub fn apply_env(mut self) -> Self {
        if let Some(bind) = env_value("SOFTMENTION_BIND") {
            self.bind_address = bind;
        }
        if let Some(key) = env_value("SOFTMENTION_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = env_value("SOFTMENTION_VISUALIZATION_URL") {
            self.visualization_url = Some(url);
        }
        if let Some(secs) = env_value("SOFTMENTION_NOTIFY_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(secs) => self.notify_timeout_secs = secs,
                Err(_) => warn!(
                    "Ignoring SOFTMENTION_NOTIFY_TIMEOUT_SECS={} (not a number of seconds)",
                    secs
                ),
            }
        }
        if let Some(provider) = env_value("SOFTMENTION_DEFAULT_PROVIDER") {
            match provider.parse() {
                Ok(provider) => self.default_provider = provider,
                Err(e) => warn!("Ignoring SOFTMENTION_DEFAULT_PROVIDER: {}", e),
            }
        }
        if let Some(id) = env_value("SOFTMENTION_SERVICE_ID") {
            self.service.id = id;
        }
        if let Some(inbox) = env_value("SOFTMENTION_SERVICE_INBOX") {
            self.service.inbox = inbox;
        }
        self
    }

    /// The configured API key, `None` when blank
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs.max(1))
    }

    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join(DATABASE_FILE))
    }

    pub fn blacklist_path(&self, root_folder: &Path) -> PathBuf {
        self.blacklist_path
            .clone()
            .unwrap_or_else(|| root_folder.join(BLACKLIST_FILE))
    }

    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity {
            id: self.service.id.clone(),
            name: self.service.name.clone(),
            inbox: self.service.inbox.clone(),
        }
    }
}
