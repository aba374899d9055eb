//! Chain-explorer client used by the win classifier.

use async_trait::async_trait;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};

use crate::{
    config::ExplorerConfig,
    types::{Tipset, TipsetBlock},
    upstream::{http_client::HttpClient, UpstreamError},
};

/// Anything that can return the canonical tipset at a height.
#[async_trait]
pub trait TipsetSource: Send + Sync {
    /// Looks up the tipset at `height`. Read-only and idempotent.
    async fn tipset(&self, height: u64) -> Result<Tipset, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct ExplorerBlock {
    #[serde(default)]
    miner: String,
    #[serde(default)]
    cid: String,
}

#[derive(Debug, Deserialize)]
struct ExplorerData {
    #[serde(default)]
    height: i64,
    #[serde(default)]
    blocks: Option<Vec<ExplorerBlock>>,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    code: i64,
    data: Option<ExplorerData>,
}

/// HTTP client for a filscout-style explorer (`GET {base_url}/tipset/{height}`).
pub struct ExplorerClient {
    base_url: String,
    timeout: Duration,
    http_client: Arc<HttpClient>,
}

impl ExplorerClient {
    #[must_use]
    pub fn new(config: &ExplorerConfig, http_client: Arc<HttpClient>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_seconds),
            http_client,
        }
    }

    fn tipset_url(&self, height: u64) -> String {
        format!("{}/tipset/{height}", self.base_url)
    }

    fn parse_response(url: &str, height: u64, body: &[u8]) -> Result<Tipset, UpstreamError> {
        let response: ExplorerResponse = serde_json::from_slice(body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("Invalid JSON: {e}")))?;

        let Some(data) = response.data else {
            tracing::debug!(url = %url, code = response.code, "explorer returned no data");
            return Err(UpstreamError::MissingResult(url.to_string()));
        };

        if data.height != 0 && u64::try_from(data.height).ok() != Some(height) {
            return Err(UpstreamError::InvalidResponse(format!(
                "requested height {height}, explorer answered {}",
                data.height
            )));
        }

        let blocks = data
            .blocks
            .unwrap_or_default()
            .into_iter()
            .map(|b| TipsetBlock { miner: b.miner, cid: b.cid })
            .collect();

        Ok(Tipset { height, blocks })
    }
}

#[async_trait]
impl TipsetSource for ExplorerClient {
    async fn tipset(&self, height: u64) -> Result<Tipset, UpstreamError> {
        let url = self.tipset_url(height);
        let body = self.http_client.get(&url, self.timeout).await.inspect_err(|e| {
            tracing::warn!(url = %url, error = %e, "tipset lookup failed");
        })?;

        Self::parse_response(&url, height, &body).inspect_err(|e| {
            tracing::warn!(url = %url, error = %e, "tipset response rejected");
        })
    }
}
