//! mockito wrappers for the chain-node JSON-RPC API and the explorer REST API.

use mockito::{Matcher, Mock, Server, ServerGuard};
use poolwatch_core::config::{AnchorEndpointConfig, ExplorerConfig};
use serde_json::json;

const RPC_PATH: &str = "/rpc/v0";

/// A chain node answering `Filecoin.ChainHead`.
pub struct ChainNodeMock {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl ChainNodeMock {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// RPC URL to put in an endpoint config.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}{RPC_PATH}", self.server.url())
    }

    /// Answers with a head at `height` mined by `miners`, one block each.
    pub fn mock_chain_head(&mut self, height: u64, miners: &[&str]) -> &mut Self {
        let blocks: Vec<_> = miners.iter().map(|miner| json!({ "Miner": miner })).collect();
        let mock = self
            .server
            .mock("POST", RPC_PATH)
            .match_body(Matcher::Regex(r#""method"\s*:\s*"Filecoin.ChainHead""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": { "Height": height, "Blocks": blocks }
                })
                .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    /// Same as [`ChainNodeMock::mock_chain_head`] but only with matching basic auth.
    pub fn mock_chain_head_with_auth(
        &mut self,
        height: u64,
        miners: &[&str],
        authorization: &str,
    ) -> &mut Self {
        let blocks: Vec<_> = miners.iter().map(|miner| json!({ "Miner": miner })).collect();
        let mock = self
            .server
            .mock("POST", RPC_PATH)
            .match_header("authorization", authorization)
            .with_status(200)
            .with_body(
                json!({ "jsonrpc": "2.0", "id": 1, "result": { "Height": height, "Blocks": blocks } })
                    .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    pub fn mock_status(&mut self, status: usize) -> &mut Self {
        let mock = self.server.mock("POST", RPC_PATH).with_status(status).with_body("down").create();
        self.mocks.push(mock);
        self
    }

    /// A JSON-RPC error reply, which carries no `result`.
    pub fn mock_rpc_error(&mut self) -> &mut Self {
        let mock = self
            .server
            .mock("POST", RPC_PATH)
            .with_status(200)
            .with_body(
                json!({ "jsonrpc": "2.0", "id": 1, "error": { "code": -32000, "message": "boom" } })
                    .to_string(),
            )
            .create();
        self.mocks.push(mock);
        self
    }

    /// Drops every mock so the next answers can be set up fresh.
    pub fn reset(&mut self) {
        for mock in self.mocks.drain(..) {
            mock.remove();
        }
    }
}

/// A filscout-style explorer serving `GET /tipset/{height}`.
pub struct ExplorerMock {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl ExplorerMock {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Serves the tipset at `height` as `(miner, cid)` pairs.
    pub fn mock_tipset(&mut self, height: u64, blocks: &[(&str, &str)]) -> &mut Self {
        let mock = self.tipset_mock(height, blocks).create();
        self.mocks.push(mock);
        self
    }

    /// Like [`ExplorerMock::mock_tipset`] and returns the mock so hits can be asserted.
    pub fn mock_tipset_expect(&mut self, height: u64, blocks: &[(&str, &str)], hits: usize) -> Mock {
        self.tipset_mock(height, blocks).expect(hits).create()
    }

    pub fn mock_tipset_status(&mut self, height: u64, status: usize) -> &mut Self {
        let mock = self
            .server
            .mock("GET", format!("/tipset/{height}").as_str())
            .with_status(status)
            .with_body("explorer unavailable")
            .create();
        self.mocks.push(mock);
        self
    }

    /// A 200 reply without `data`, as the explorer sends for unindexed heights.
    pub fn mock_tipset_without_data(&mut self, height: u64) -> &mut Self {
        let mock = self
            .server
            .mock("GET", format!("/tipset/{height}").as_str())
            .with_status(200)
            .with_body(json!({ "code": 404 }).to_string())
            .create();
        self.mocks.push(mock);
        self
    }

    pub fn reset(&mut self) {
        for mock in self.mocks.drain(..) {
            mock.remove();
        }
    }

    fn tipset_mock(&mut self, height: u64, blocks: &[(&str, &str)]) -> Mock {
        let blocks: Vec<_> =
            blocks.iter().map(|(miner, cid)| json!({ "miner": miner, "cid": cid })).collect();
        self.server
            .mock("GET", format!("/tipset/{height}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "code": 0, "data": { "height": height, "blocks": blocks } }).to_string())
    }
}

#[must_use]
pub fn endpoint_config(name: &str, url: &str) -> AnchorEndpointConfig {
    AnchorEndpointConfig {
        name: Some(name.to_string()),
        url: url.to_string(),
        timeout_seconds: 2,
        user: None,
        password: None,
    }
}

#[must_use]
pub fn explorer_config(base_url: &str) -> ExplorerConfig {
    ExplorerConfig { base_url: base_url.to_string(), timeout_seconds: 2 }
}
