//! Forwarding of author verdicts to the visualization service
//!
//! Best-effort: callers log failures and carry on.

use reqwest::Url;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::dispatcher::DeliveryError;

/// Author decision carried by an inbound Accept/Reject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    fn route_segment(&self) -> &'static str {
        match self {
            Verdict::Accepted => "accepted_notification",
            Verdict::Rejected => "rejected_notification",
        }
    }
}

/// Client for `POST /api/{accepted|rejected}_notification/{id}/{name}`
pub struct VisualizationClient {
    http_client: reqwest::Client,
    base_url: Option<Url>,
    timeout: Duration,
}

impl VisualizationClient {
    /// `base_url = None` disables forwarding
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self, DeliveryError> {
        let base_url = base_url
            .map(|url| Url::parse(url).map_err(|e| DeliveryError::InvalidUrl(format!("{}: {}", url, e))))
            .transpose()?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            timeout,
        })
    }

    pub fn disabled() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Endpoint for one verdict, path segments percent-encoded
    pub fn endpoint(
        &self,
        verdict: Verdict,
        document_id: &str,
        software_name: &str,
    ) -> Result<Option<Url>, DeliveryError> {
        let Some(base) = &self.base_url else {
            return Ok(None);
        };

        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| DeliveryError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(["api", verdict.route_segment(), document_id, software_name]);

        Ok(Some(url))
    }

    /// Forward a verdict; `Ok(false)` when forwarding is disabled
    pub async fn forward(
        &self,
        verdict: Verdict,
        document_id: &str,
        software_name: &str,
    ) -> Result<bool, DeliveryError> {
        let Some(url) = self.endpoint(verdict, document_id, software_name)? else {
            debug!("Visualization forwarding disabled");
            return Ok(false);
        };

        let response = self
            .http_client
            .post(url)
            .send()
            .await
            .map_err(|e| DeliveryError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status(status.as_u16(), error_text));
        }

        debug!(document_id = document_id, software = software_name, "Verdict forwarded to visualization");
        Ok(true)
    }
}
