//! Integration tests for the pool watch service.
//!
//! - `anchor_resolver_tests`: resolver against mockito chain nodes
//! - `classifier_tests`: win classification against a mockito explorer
//! - `server_tests`: full router driven through `tower::ServiceExt::oneshot`
//! - `mock_infrastructure`: reusable chain-node and explorer mocks
//!
//! Run with `cargo test --package tests`.

#[cfg(test)]
mod anchor_resolver_tests;

#[cfg(test)]
mod classifier_tests;


/// Mock infrastructure for testing
pub mod mock_infrastructure;
