//! Win report pipeline.
//!
//! [`WinIntake`] validates miner submissions and appends them to the pending
//! queue held by [`crate::retention::RetentionStore`]. [`WinClassifier`] runs
//! on a fixed interval, drains reports older than the cutoff and checks each
//! one against the explorer's tipset at that height:
//!
//! ```text
//! pending --(cutoff elapsed)--> tipset(height) --cid present--> wins
//!                                     |
//!                                     +--cid absent--> diagnose --> orphans
//!                                     |
//!                                     +--lookup failed--> pending (retry) | dropped
//! ```

pub mod classifier;
pub mod errors;
pub mod intake;

pub use classifier::{ClassifierConfig, TickSummary, WinClassifier};
pub use errors::WinError;
pub use intake::WinIntake;
