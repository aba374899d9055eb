use thiserror::Error;

use crate::upstream::UpstreamError;

/// Errors raised by the win intake and classifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WinError {
    /// A submitted report is missing a required field.
    #[error("invalid win report: {0}")]
    Validation(String),

    /// The explorer could not produce a tipset for `height`.
    #[error("tipset lookup failed at height {height}: {source}")]
    ExternalLookup { height: u64, source: UpstreamError },

    /// Processing one report panicked.
    #[error("classification fault: {0}")]
    ClassificationFault(String),
}

impl WinError {
    /// Whether a later tick could classify the report that raised this.
    ///
    /// Lookup failures defer to [`UpstreamError::is_transient`]. A panic is
    /// retried because it may depend on explorer data that changes.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::ExternalLookup { source, .. } => source.is_transient(),
            Self::ClassificationFault(_) => true,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ExternalLookup { .. } => "external_lookup",
            Self::ClassificationFault(_) => "classification_fault",
        }
    }
}
