use parking_lot::Mutex;
use tracing::warn;

use crate::types::{AnchorHead, AnchorSample};

/// The single cached anchor `(height, block_count)` pair.
///
/// Guarded by an exclusive lock that is only held for the compare or the
/// write, never across network I/O.
#[derive(Debug, Default)]
pub struct AnchorCache {
    head: Mutex<AnchorHead>,
}

impl AnchorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the cached head.
    #[must_use]
    pub fn current(&self) -> AnchorHead {
        *self.head.lock()
    }

    /// Replaces the cached head with the refresh winner.
    ///
    /// The last write wins. A lower height is logged as an anomaly and still
    /// applied.
    pub fn update(&self, winner: &AnchorSample) -> AnchorHead {
        let mut head = self.head.lock();
        if winner.height < head.height {
            warn!(
                previous_height = head.height,
                new_height = winner.height,
                url = %winner.source_url,
                "anchor height decreased"
            );
        }
        *head = AnchorHead { height: winner.height, block_count: winner.block_count };
        *head
    }
}
