use reqwest::{Client, ClientBuilder, RequestBuilder};
use std::time::Duration;

use crate::upstream::UpstreamError;

/// Bodies longer than this are truncated before they land in an error.
const MAX_ERROR_BODY_LEN: usize = 256;

/// Basic-auth pair forwarded to a chain node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: Option<String>,
}

/// Shared HTTP client for chain-node and explorer calls.
///
/// One pooled [`reqwest::Client`] backs every endpoint; each call carries its
/// own timeout. There are no retries at this layer: a failed call is reported
/// once and the caller decides whether it matters.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with pooled connections and rustls TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(16)
            .connect_timeout(Duration::from_secs(5))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(concat!("poolwatch/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                UpstreamError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self { client })
    }

    /// Sanitizes network errors so URLs and credentials stay out of replies.
    fn sanitize_network_error(error: &reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            return UpstreamError::Timeout;
        }

        let message = if error.is_connect() {
            "connection refused or unreachable"
        } else if error.is_request() {
            "request failed"
        } else if error.is_body() {
            "response body error"
        } else if error.is_decode() {
            "response decode error"
        } else if error.is_redirect() {
            "too many redirects"
        } else {
            "network error"
        };
        UpstreamError::ConnectionFailed(message.to_string())
    }

    /// Sends a JSON POST and returns the raw body of a 200 response.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Timeout`] if the call exceeds `timeout`
    /// - [`UpstreamError::HttpError`] for any status other than 200
    /// - [`UpstreamError::ConnectionFailed`] for network-related failures
    pub async fn post_json(
        &self,
        url: &str,
        body: bytes::Bytes,
        timeout: Duration,
        auth: Option<&BasicAuth>,
    ) -> Result<bytes::Bytes, UpstreamError> {
        let mut request = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .timeout(timeout);

        if let Some(auth) = auth {
            request = request.basic_auth(&auth.user, auth.password.as_deref());
        }

        Self::execute(request).await
    }

    /// Sends an unauthenticated GET and returns the raw body of a 200 response.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::post_json`].
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<bytes::Bytes, UpstreamError> {
        Self::execute(self.client.get(url).timeout(timeout)).await
    }

    async fn execute(request: RequestBuilder) -> Result<bytes::Bytes, UpstreamError> {
        let response = request.send().await.map_err(|e| Self::sanitize_network_error(&e))?;

        let status = response.status().as_u16();
        if status != 200 {
            let raw_text = response.text().await.unwrap_or_default();
            let sanitized_text = if raw_text.len() > MAX_ERROR_BODY_LEN {
                let mut end = MAX_ERROR_BODY_LEN;
                while !raw_text.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}... (truncated)", &raw_text[..end])
            } else {
                raw_text
            };
            tracing::trace!(status = status, "http request failed");
            return Err(UpstreamError::HttpError(status, sanitized_text));
        }

        response.bytes().await.map_err(|e| Self::sanitize_network_error(&e))
    }
}
