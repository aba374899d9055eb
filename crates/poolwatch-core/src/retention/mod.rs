//! Bounded in-memory history of win reports.
//!
//! - [`BoundedHistory`]: batch-evicting buffer, independent of locking
//! - [`RetentionStore`]: pending queue, win and orphan history, counters
//! - [`RetentionStatus`]: serializable snapshot returned by status queries

pub mod history;
pub mod store;

pub use history::BoundedHistory;
pub use store::{RetentionStatus, RetentionStore};
