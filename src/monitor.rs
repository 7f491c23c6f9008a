//! Sophon monitoring API client
//!
//! One `GET <base>/nodes?operators=<id>` per status request, no caching and
//! no retries. Every failure is converted into a user-facing text message at
//! this boundary so a flaky monitor can never take the dispatch loop down.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::debug;

const OPERATOR_UNSET_MSG: &str =
    "Operator is not set. Use /set_operator <operator_id> to configure one.";
const NO_DATA_MSG: &str = "No data available.";

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("monitor returned HTTP {0}")]
    Status(StatusCode),

    #[error("malformed monitor response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

/// Rewards come back as either a string or a bare number depending on the
/// monitor version.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Rewards {
    Text(String),
    Number(f64),
}

impl Default for Rewards {
    fn default() -> Self {
        Rewards::Text("0".to_string())
    }
}

impl fmt::Display for Rewards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rewards::Text(s) => write!(f, "{}", s),
            Rewards::Number(n) => write!(f, "{}", n),
        }
    }
}

/// One node entry from the monitor. Individual fields may be absent and
/// default per field; the surrounding `nodes` array is required.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    #[serde(default = "default_operator_name")]
    pub operator: String,
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub rewards: Rewards,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub uptime: f64,
}

fn default_operator_name() -> String {
    "N/A".to_string()
}

#[derive(Debug, Deserialize)]
struct NodesResponse {
    nodes: Vec<NodeStatus>,
}

/// Client for the node monitoring API
#[derive(Debug, Clone)]
pub struct MonitorClient {
    client: Client,
    base_url: String,
}

impl MonitorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch node status and render the uptime report.
    ///
    /// An unset operator returns guidance text without touching the network.
    /// Remote failures come back as descriptive text, never as an error.
    pub async fn fetch_uptime(&self, operator: Option<&str>) -> String {
        let Some(operator) = operator else {
            return OPERATOR_UNSET_MSG.to_string();
        };

        match self.fetch_nodes(operator).await {
            Ok(nodes) => match nodes.first() {
                Some(node) => render_report(node),
                None => NO_DATA_MSG.to_string(),
            },
            Err(e) => format!("Error fetching data: {}", e),
        }
    }

    async fn fetch_nodes(&self, operator: &str) -> Result<Vec<NodeStatus>, MonitorError> {
        let url = format!("{}/nodes", self.base_url);
        debug!("Querying monitor: {} operators={}", url, operator);

        let response = self
            .client
            .get(&url)
            .query(&[("operators", operator)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Status(status));
        }

        let body = response.bytes().await?;
        let parsed: NodesResponse = serde_json::from_slice(&body)?;
        Ok(parsed.nodes)
    }
}

fn render_report(node: &NodeStatus) -> String {
    let status = if node.status { "Online" } else { "Offline" };
    format!(
        "Operator: {}\n\
         Status: {}\n\
         Rewards: {}\n\
         Fee: {}%\n\
         Uptime: {:.2}%",
        node.operator, status, node.rewards, node.fee, node.uptime
    )
}
