//! Outbound HTTP to chain nodes and the chain explorer.
//!
//! - [`node`]: `ChainHead` JSON-RPC queries behind the [`HeadSource`] trait
//! - [`explorer`]: tipset lookups behind the [`TipsetSource`] trait
//! - [`http_client`]: the shared reqwest client both use

pub mod errors;
pub mod explorer;
pub mod http_client;
pub mod node;

pub use errors::UpstreamError;
pub use explorer::{ExplorerClient, TipsetSource};
pub use http_client::{BasicAuth, HttpClient};
pub use node::{HeadSource, NodeEndpoint, CHAIN_HEAD_METHOD};
