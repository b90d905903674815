//! HTTP client for the central collector.
//!
//! Agents pull configuration updates from central and push finished
//! aggregate intervals to it.

use crate::aggregator::IntervalSnapshot;
use crate::config::ConfigUpdate;
use crate::utils::config::DEFAULT_CENTRAL_TIMEOUT;
use crate::utils::error::CentralError;
use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use std::time::Duration;

/// Client for one central collector endpoint
pub struct CentralClient {
    client: Client,
    base_url: String,
}

impl CentralClient {
    /// Create a new central client
    pub fn new(base_url: impl Into<String>) -> Result<Self, CentralError> {
        Self::with_timeout(base_url, DEFAULT_CENTRAL_TIMEOUT)
    }

    /// Create a client with custom timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CentralError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CentralError::RequestFailed)?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&base_url.into()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the pending configuration update for an agent
    ///
    /// # Returns
    /// `None` when central has nothing new for this agent
    ///
    /// # Errors
    /// * `CentralError::AgentNotFound` - central does not know the agent
    /// * `CentralError::InvalidResponse` - unexpected status or body
    /// * `CentralError::RequestFailed` - transport failure
    pub fn fetch_config_update(
        &self,
        agent_id: &str,
    ) -> Result<Option<ConfigUpdate>, CentralError> {
        let url = agent_url(&self.base_url, agent_id, "config");
        info!("Fetching config update for agent: {}", agent_id);

        let response = self.client.get(&url).send().map_err(CentralError::RequestFailed)?;

        if response.status() == StatusCode::NO_CONTENT {
            debug!("No config update pending");
            return Ok(None);
        }
        let response = check_status(response, agent_id)?;

        let update: ConfigUpdate = response.json().map_err(|e| {
            CentralError::InvalidResponse(format!("Malformed config update: {}", e))
        })?;
        Ok(Some(update))
    }

    /// Push one finished interval's aggregates
    ///
    /// # Errors
    /// * `CentralError::AgentNotFound` - central does not know the agent
    /// * `CentralError::InvalidResponse` - central rejected the aggregates
    /// * `CentralError::RequestFailed` - transport failure
    pub fn send_aggregates(
        &self,
        agent_id: &str,
        interval: &IntervalSnapshot,
    ) -> Result<(), CentralError> {
        let url = agent_url(&self.base_url, agent_id, "aggregates");
        info!(
            "Sending {} transaction type(s) captured at {}",
            interval.transaction_types.len(),
            interval.capture_time.to_rfc3339()
        );

        let response = self
            .client
            .post(&url)
            .json(interval)
            .send()
            .map_err(CentralError::RequestFailed)?;
        check_status(response, agent_id)?;

        debug!("Aggregates accepted by central");
        Ok(())
    }
}

/// Strip trailing slashes so paths can be appended verbatim
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

fn agent_url(base_url: &str, agent_id: &str, resource: &str) -> String {
    format!("{}/agents/{}/{}", base_url, agent_id, resource)
}

/// Map HTTP status to our error type
fn check_status(response: Response, agent_id: &str) -> Result<Response, CentralError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(CentralError::AgentNotFound(agent_id.to_string()));
    }
    Err(CentralError::InvalidResponse(format!(
        "HTTP {}: {}",
        status,
        response.text().unwrap_or_default()
    )))
}
