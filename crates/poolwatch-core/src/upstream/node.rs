//! Chain-node client used by the anchor resolver.

use async_trait::async_trait;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};

use crate::{
    config::AnchorEndpointConfig,
    types::AnchorSample,
    upstream::{
        http_client::{BasicAuth, HttpClient},
        UpstreamError,
    },
};

/// JSON-RPC method that returns the current chain head.
pub const CHAIN_HEAD_METHOD: &str = "Filecoin.ChainHead";

/// Anything that can report the current chain head.
///
/// Implemented by [`NodeEndpoint`] for real nodes. Tests provide in-memory
/// sources.
#[async_trait]
pub trait HeadSource: Send + Sync {
    /// URL used in logs and as the sample's source.
    fn url(&self) -> &str;

    /// Upper bound on a single query.
    fn timeout(&self) -> Duration;

    /// Queries the current head once, without retrying.
    async fn chain_head(&self) -> Result<AnchorSample, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct ChainHeadBlock {
    #[serde(rename = "Miner")]
    #[allow(dead_code)]
    miner: String,
}

#[derive(Debug, Deserialize)]
struct ChainHeadResult {
    #[serde(rename = "Height")]
    height: i64,
    #[serde(rename = "Blocks", default)]
    blocks: Vec<ChainHeadBlock>,
}

#[derive(Debug, Deserialize)]
struct ChainHeadResponse {
    result: Option<ChainHeadResult>,
}

/// A configured chain node reachable over JSON-RPC.
pub struct NodeEndpoint {
    url: Arc<str>,
    timeout: Duration,
    auth: Option<BasicAuth>,
    http_client: Arc<HttpClient>,
}

impl NodeEndpoint {
    #[must_use]
    pub fn new(config: &AnchorEndpointConfig, http_client: Arc<HttpClient>) -> Self {
        let auth = config
            .user
            .as_ref()
            .filter(|user| !user.is_empty())
            .map(|user| BasicAuth { user: user.clone(), password: config.password.clone() });

        Self {
            url: Arc::from(config.url.as_str()),
            timeout: Duration::from_secs(config.timeout_seconds),
            auth,
            http_client,
        }
    }

    fn request_body() -> bytes::Bytes {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": CHAIN_HEAD_METHOD,
            "params": [],
            "id": 1,
        });
        bytes::Bytes::from(body.to_string())
    }

    fn parse_response(&self, body: &[u8]) -> Result<AnchorSample, UpstreamError> {
        let response: ChainHeadResponse = serde_json::from_slice(body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("Invalid JSON: {e}")))?;

        let result = response.result.ok_or_else(|| UpstreamError::MissingResult(self.url.to_string()))?;

        let height = u64::try_from(result.height).map_err(|_| {
            UpstreamError::InvalidResponse(format!("negative height {}", result.height))
        })?;

        Ok(AnchorSample { height, block_count: result.blocks.len(), source_url: self.url.clone() })
    }
}

#[async_trait]
impl HeadSource for NodeEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn chain_head(&self) -> Result<AnchorSample, UpstreamError> {
        let body = self
            .http_client
            .post_json(&self.url, Self::request_body(), self.timeout, self.auth.as_ref())
            .await?;

        let sample = self.parse_response(&body)?;
        tracing::debug!(
            url = %self.url,
            height = sample.height,
            blocks = sample.block_count,
            "chain head query ok"
        );
        Ok(sample)
    }
}
