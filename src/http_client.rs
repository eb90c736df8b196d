//! The `HttpClient` collaborator interface and its default `reqwest`-backed
//! implementation.

use std::time::Duration;

use async_trait::async_trait;

use crate::context::CachePolicy;
use crate::error::Error;

/// Response metadata returned alongside a fetched body.
///
/// Exposes at least the status code and arbitrary header access; non-2xx is
/// returned here for the caller to interpret rather than being turned into
/// an error by the client itself.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status_code: u16,
    headers: Vec<(String, String)>,
}

impl ResponseMeta {
    #[must_use]
    pub fn new(status_code: u16, headers: Vec<(String, String)>) -> Self {
        Self {
            status_code,
            headers,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The HTTP transport the pipeline delegates to.
///
/// Implementations MUST convert transport-level failures (connect/read/write
/// timeouts, connection reset, DNS failure) into [`Error::Network`]; they
/// MUST NOT treat a non-2xx response as an error themselves — the status
/// code is handed back for the caller (the paged producer or the follow
/// operator) to interpret.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        cache_policy: &CachePolicy,
    ) -> Result<(String, ResponseMeta), Error>;
}

/// Default [`HttpClient`] backed by `reqwest`.
///
/// Mirrors `forge-webfetch`'s HTTP layer: one pooled async client, gzip/
/// brotli/deflate transparent decoding, a bounded redirect policy, and a
/// configurable User-Agent. `cache_policy` is communicated to the server as
/// a `Cache-Control` request header; this client performs no caching of its
/// own and holds no persisted state — on-disk caching is out of scope.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` cannot be built (invalid
    /// TLS backend configuration), matching `reqwest::Client::new`'s own
    /// panicking behaviour.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent("aem-index-client/0.1")
            .build()
            .expect("reqwest client configuration is valid");
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_control_header(policy: &CachePolicy) -> Option<String> {
    match policy {
        CachePolicy::Default => None,
        CachePolicy::NoCache => Some("no-cache".to_string()),
        CachePolicy::CacheOnly => Some("only-if-cached".to_string()),
        CachePolicy::CacheElseLoad => None,
        CachePolicy::Custom {
            max_age,
            ignore_server_cache_control,
        } => {
            let mut parts = Vec::new();
            if let Some(age) = max_age {
                parts.push(format!("max-age={}", age.as_secs()));
            }
            if *ignore_server_cache_control {
                parts.push("no-transform".to_string());
            }
            (!parts.is_empty()).then(|| parts.join(", "))
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn fetch(
        &self,
        url: &str,
        cache_policy: &CachePolicy,
    ) -> Result<(String, ResponseMeta), Error> {
        let mut request = self.client.get(url);
        if let Some(header) = cache_control_header(cache_policy) {
            request = request.header(reqwest::header::CACHE_CONTROL, header);
        }

        tracing::debug!(url, "fetching page");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timeout: {e}"))
            } else if e.is_connect() {
                Error::Network(format!("connect failed: {e}"))
            } else {
                Error::Network(e.to_string())
            }
        })?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("failed reading response body: {e}")))?;

        Ok((body, ResponseMeta::new(status_code, headers)))
    }
}
