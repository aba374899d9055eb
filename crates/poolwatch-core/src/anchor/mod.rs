//! Anchor height resolution.
//!
//! [`AnchorResolver`] answers "how many blocks are at height N" from a cached
//! head. A cache miss fans out one concurrent `ChainHead` query per configured
//! node and keeps the highest `(height, block_count)` answer.

pub mod cache;
pub mod errors;
pub mod resolver;

pub use cache::AnchorCache;
pub use errors::AnchorError;
pub use resolver::{select_winner, AnchorResolver, Selection};
