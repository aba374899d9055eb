use thiserror::Error;

/// Errors raised while talking to a chain node or the chain explorer.
///
/// A chain-node failure only removes that node from one anchor refresh. An
/// explorer failure defers the affected win report to a later tick. Neither
/// reaches an HTTP caller directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the per-call timeout.
    #[error("Request timeout")]
    Timeout,

    /// The remote could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Remote answered with a non-200 status.
    ///
    /// First field is the HTTP status code, second is a truncated body.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// Body could not be decoded into the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Body decoded but carried no `result` / `data` payload.
    #[error("Missing result in response from {0}")]
    MissingResult(String),
}

impl UpstreamError {
    /// Returns `true` if retrying later has a reasonable chance to succeed.
    ///
    /// Explorer indexing lag shows up as a missing payload or a 404, so both
    /// count as transient along with network failures and 5xx responses.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) | Self::MissingResult(_) => true,
            Self::HttpError(status, _) => *status == 404 || *status == 429 || *status >= 500,
            Self::InvalidResponse(_) => false,
        }
    }

    /// Static label used for metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::HttpError(_, _) => "http_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::MissingResult(_) => "missing_result",
        }
    }
}
