//! Core library for the pool watch service.
//!
//! Two jobs live here:
//!
//! - resolving the current chain height and its block count from several
//!   chain nodes queried in parallel ([`anchor`]);
//! - taking "I mined a block" reports from miners, waiting for the explorer
//!   to index the height, then classifying each report as a win or an orphan
//!   with a diagnosed reason ([`win`], [`retention`]).
//!
//! Every component is an owned instance built at startup and shared through
//! `Arc`. There is no process-global mutable state apart from the metrics
//! recorder.

pub mod anchor;
pub mod config;
pub mod metrics;
pub mod retention;
pub mod types;
pub mod upstream;
pub mod utils;
pub mod win;
