//! Mock servers standing in for chain nodes and the explorer.
//!
//! ```ignore
//! use tests::mock_infrastructure::{ChainNodeMock, ExplorerMock};
//!
//! let mut node = ChainNodeMock::new().await;
//! node.mock_chain_head(100, &["f01", "f02"]);
//!
//! let mut explorer = ExplorerMock::new().await;
//! explorer.mock_tipset(100, &[("f01", "bAAA")]);
//! ```

pub mod rpc_mock;

pub use rpc_mock::{endpoint_config, explorer_config, ChainNodeMock, ExplorerMock};
