//! Integration tests for `AnchorResolver` against mockito chain nodes.

use crate::mock_infrastructure::{endpoint_config, ChainNodeMock};
use poolwatch_core::{
    anchor::{AnchorError, AnchorResolver},
    types::AnchorHead,
    upstream::{HeadSource, HttpClient, NodeEndpoint},
};
use serial_test::serial;
use std::{sync::Arc, time::Duration};

fn resolver_for(nodes: &[&ChainNodeMock]) -> AnchorResolver {
    let http_client = Arc::new(HttpClient::new().expect("http client"));
    let sources = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let config = endpoint_config(&format!("node-{i}"), &node.url());
            Arc::new(NodeEndpoint::new(&config, http_client.clone())) as Arc<dyn HeadSource>
        })
        .collect();
    AnchorResolver::new(sources, Duration::ZERO)
}

#[tokio::test]
#[serial]
async fn test_highest_node_wins() {
    let mut behind = ChainNodeMock::new().await;
    behind.mock_chain_head(100, &["f01", "f02"]);
    let mut ahead = ChainNodeMock::new().await;
    ahead.mock_chain_head(101, &["f01", "f02", "f03"]);

    let resolver = resolver_for(&[&behind, &ahead]);

    assert_eq!(resolver.resolve_block_count(101).await, Ok(3));
    assert_eq!(resolver.current(), AnchorHead { height: 101, block_count: 3 });
}

#[tokio::test]
#[serial]
async fn test_divergent_counts_pick_largest() {
    let mut first = ChainNodeMock::new().await;
    first.mock_chain_head(100, &["f01", "f02"]);
    let mut second = ChainNodeMock::new().await;
    second.mock_chain_head(100, &["f01", "f02", "f03"]);

    let resolver = resolver_for(&[&first, &second]);

    assert_eq!(resolver.resolve_block_count(100).await, Ok(3));
}

#[tokio::test]
#[serial]
async fn test_failing_nodes_are_excluded() {
    let mut down = ChainNodeMock::new().await;
    down.mock_status(502);
    let mut erroring = ChainNodeMock::new().await;
    erroring.mock_rpc_error();
    let mut healthy = ChainNodeMock::new().await;
    healthy.mock_chain_head(200, &["f01"]);

    let resolver = resolver_for(&[&down, &erroring, &healthy]);

    assert_eq!(resolver.resolve_block_count(200).await, Ok(1));
}

#[tokio::test]
#[serial]
async fn test_all_nodes_down_leaves_cache_unchanged() {
    let mut node = ChainNodeMock::new().await;
    node.mock_chain_head(300, &["f01", "f02"]);
    let resolver = resolver_for(&[&node]);
    assert_eq!(resolver.resolve_block_count(300).await, Ok(2));

    node.reset();
    node.mock_status(500);

    assert!(resolver.refresh().await.is_none());
    assert_eq!(resolver.current(), AnchorHead { height: 300, block_count: 2 });
    assert_eq!(
        resolver.resolve_block_count(301).await,
        Err(AnchorError::Unresolved { requested: 301, current: 300 })
    );
}

#[tokio::test]
#[serial]
async fn test_stale_request_after_progress() {
    let mut node = ChainNodeMock::new().await;
    node.mock_chain_head(400, &["f01"]);
    let resolver = resolver_for(&[&node]);
    resolver.resolve_block_count(400).await.unwrap();

    node.reset();
    node.mock_chain_head(401, &["f01", "f02"]);
    assert_eq!(resolver.resolve_block_count(401).await, Ok(2));

    assert_eq!(
        resolver.resolve_block_count(400).await,
        Err(AnchorError::StaleRequest { requested: 400, current: 401 })
    );
}

#[tokio::test]
#[serial]
async fn test_basic_auth_credentials_sent() {
    let mut node = ChainNodeMock::new().await;
    node.mock_chain_head_with_auth(500, &["f01"], "Basic bG90dXM6c2VjcmV0");

    let mut config = endpoint_config("secured", &node.url());
    config.user = Some("lotus".to_string());
    config.password = Some("secret".to_string());

    let http_client = Arc::new(HttpClient::new().expect("http client"));
    let source: Arc<dyn HeadSource> = Arc::new(NodeEndpoint::new(&config, http_client));
    let resolver = AnchorResolver::new(vec![source], Duration::ZERO);

    assert_eq!(resolver.resolve_block_count(500).await, Ok(1));
}
