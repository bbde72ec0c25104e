//! HTTP transport
//!
//! [`HttpTransport`] is the only thing in the pipeline that touches the network. The production
//! implementation, [`PooledTransport`], shares one `reqwest::Client` (and therefore one
//! connection pool) between every fetch and enforces a hard ceiling on in-flight requests
//! with a semaphore. Fetches beyond the ceiling wait for a permit instead of opening new
//! connections.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// Raw outcome of one request that reached the server
#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed `Retry-After` header, when present and numeric
    pub retry_after: Option<Duration>,
    /// Full response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues one page request
///
/// Implementations must release every resource they acquire when the returned future is
/// dropped, since the aggregator cancels sibling fetches by dropping them.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET one page for `key`
    ///
    /// Returns `Err` only when no complete response was obtained (connect, timeout, I/O).
    /// Non-2xx statuses come back as `Ok` for the caller to classify.
    async fn get_page(&self, key: &str, page: u32) -> Result<TransportResponse>;

    /// Maximum number of requests this transport runs at once
    fn max_in_flight(&self) -> usize;
}

/// Connection-pooled transport over `reqwest`
pub struct PooledTransport {
    client: Client,
    base_url: String,
    key_param: String,
    page_param: String,
    permits: Arc<Semaphore>,
    max_connections: usize,
}

impl PooledTransport {
    /// Build the client and its connection ceiling from configuration
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if the HTTP client cannot be created
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let max_connections = config.max_connections.max(1);

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(max_connections)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            key_param: config.key_param.clone(),
            page_param: config.page_param.clone(),
            permits: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Endpoint every request goes to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests that could start right now without waiting
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl HttpTransport for PooledTransport {
    async fn get_page(&self, key: &str, page: u32) -> Result<TransportResponse> {
        // Held until the body has been read; dropping the future returns it
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Transport("connection pool closed".to_string()))?;

        tracing::debug!(key, page, url = %self.base_url, "requesting page");

        let page_value = page.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                (self.key_param.as_str(), key),
                (self.page_param.as_str(), page_value.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::from_reqwest(key, page, &e))?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::from_reqwest(key, page, &e))?
            .to_vec();

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }

    fn max_in_flight(&self) -> usize {
        self.max_connections
    }
}

/// Read a `Retry-After` header given in seconds
///
/// Integer and decimal values are accepted. HTTP-dates, negative numbers and anything
/// unparsable yield `None` so the caller falls back to its own backoff.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    match value.parse::<f64>() {
        // try_from_secs_f64 rejects negatives, NaN and values too large for a Duration
        Ok(secs) => Duration::try_from_secs_f64(secs).ok(),
        Err(_) => {
            tracing::debug!(value, "ignoring non-numeric Retry-After header");
            None
        }
    }
}
