//! Outbound notification delivery
//!
//! One POST per grouped mention, no retries. Failures are logged and counted;
//! they never propagate to the caller.

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::payload::{
    build_action_review, build_relationship_announce, NotificationPayload, OutboundNotification,
    ServiceIdentity,
};
use super::provider::{Provider, ProviderConfig, ProviderDirectory};
use crate::models::GroupedMention;

/// Media type of COAR Notify payloads
pub const JSON_LD: &str = "application/ld+json";

const USER_AGENT: &str = concat!("softmention-hub/", env!("CARGO_PKG_VERSION"));

/// Outbound delivery errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeliveryError {
    pub(crate) fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            DeliveryError::Timeout(timeout)
        } else {
            DeliveryError::Network(error.to_string())
        }
    }
}

/// Aggregate outcome of one [`NotificationDispatcher::dispatch`] call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub provider: Provider,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_count: usize,
}

/// Builds and sends notifications to provider inboxes
pub struct NotificationDispatcher {
    http_client: reqwest::Client,
    identity: ServiceIdentity,
    providers: ProviderDirectory,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(
        identity: ServiceIdentity,
        providers: ProviderDirectory,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            identity,
            providers,
            timeout,
        })
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Build the provider-appropriate payload for one grouped mention
    ///
    /// HAL receives ActionReview offers, Software Heritage receives
    /// RelationshipAnnounce. `None` when the provider has no configuration.
    pub fn build_payload(
        &self,
        document_id: &str,
        mention: &GroupedMention,
        provider: Provider,
    ) -> Option<OutboundNotification> {
        let target = self.providers.get(provider)?;

        match provider {
            Provider::Hal => Some(OutboundNotification::ActionReview(build_action_review(
                &self.identity,
                target,
                document_id,
                mention,
            ))),
            Provider::SoftwareHeritage => Some(OutboundNotification::RelationshipAnnounce(
                build_relationship_announce(
                    &self.identity,
                    target,
                    document_id,
                    &mention.software_name,
                    None,
                ),
            )),
            Provider::Unknown => None,
        }
    }

    /// POST one notification; `Ok` only for a 2xx response
    pub async fn send(
        &self,
        notification: &OutboundNotification,
        target: &ProviderConfig,
    ) -> Result<u16, DeliveryError> {
        let body = serde_json::to_vec(&notification.to_jsonld()?)?;

        let mut request = self
            .http_client
            .post(&target.inbox_url)
            .header(CONTENT_TYPE, JSON_LD)
            .body(body);

        if let Some(token) = target.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status(status.as_u16(), error_text));
        }

        Ok(status.as_u16())
    }

    /// Notify `provider` about every grouped mention of a document
    ///
    /// Always returns; `success_count + failure_count == total_count ==
    /// grouped.len()`.
    pub async fn dispatch(
        &self,
        document_id: &str,
        grouped: &[GroupedMention],
        provider: Provider,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary {
            provider,
            success_count: 0,
            failure_count: 0,
            total_count: grouped.len(),
        };

        let Some(target) = self.providers.get(provider) else {
            warn!(
                document_id = document_id,
                provider = %provider,
                count = grouped.len(),
                "No inbox configured for provider, notifications not sent"
            );
            summary.failure_count = grouped.len();
            return summary;
        };

        for mention in grouped {
            let Some(notification) = self.build_payload(document_id, mention, provider) else {
                summary.failure_count += 1;
                continue;
            };

            match self.send(&notification, target).await {
                Ok(status) => {
                    debug!(
                        notification_id = notification.id(),
                        software = %mention.software_name,
                        status = status,
                        "Notification delivered"
                    );
                    summary.success_count += 1;
                }
                Err(e) => {
                    warn!(
                        notification_id = notification.id(),
                        document_id = document_id,
                        software = %mention.software_name,
                        inbox = %target.inbox_url,
                        error = %e,
                        "Notification delivery failed"
                    );
                    summary.failure_count += 1;
                }
            }
        }

        info!(
            document_id = document_id,
            provider = %provider,
            success = summary.success_count,
            failure = summary.failure_count,
            total = summary.total_count,
            "Notifications dispatched"
        );

        summary
    }
}
