use thiserror::Error;

/// Errors returned by [`crate::anchor::AnchorResolver::resolve_block_count`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorError {
    /// The caller asked about a height the anchor has already passed.
    #[error("current anchor height:{current} > req {requested}")]
    StaleRequest { requested: u64, current: u64 },

    /// A refresh did not reach the requested height, either because the
    /// height is still in the future or because every node query failed.
    #[error(
        "current anchor height:{current} != req {requested} after refresh, maybe node calls failed"
    )]
    Unresolved { requested: u64, current: u64 },
}

impl AnchorError {
    /// Static label used for metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaleRequest { .. } => "stale_request",
            Self::Unresolved { .. } => "unresolved",
        }
    }
}
