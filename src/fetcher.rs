//! Single-page fetching
//!
//! [`PageFetcher`] turns one `(key, page)` request into a validated [`PageResult`]. Status
//! codes are classified here, retrying is delegated to the [`RetryPolicy`] it was built with.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, TransportResponse};
use crate::types::{PageResult, decode_page};

/// Statuses worth another attempt besides 429
const TRANSIENT_SERVER_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Fetches and decodes one page at a time
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl PageFetcher {
    /// Create a fetcher over a shared transport
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// The transport requests go through
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// The retry policy applied to every page
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch one page, retrying transient faults
    ///
    /// # Errors
    /// - [`Error::Network`], [`Error::Server`], [`Error::RateLimited`] once retries are exhausted
    /// - [`Error::Http`] for any other non-2xx status
    /// - [`Error::Decode`] if the body is malformed or a record fails validation
    /// - [`Error::EmptyPage`] if the page holds no records; this is never retried
    pub async fn fetch(&self, key: &str, page: u32) -> Result<PageResult> {
        self.policy.run(|| self.fetch_once(key, page)).await
    }

    async fn fetch_once(&self, key: &str, page: u32) -> Result<PageResult> {
        let response = self.transport.get_page(key, page).await?;
        let result = classify_response(key, page, response)?;

        if result.records.is_empty() {
            return Err(Error::EmptyPage {
                key: key.to_string(),
                page,
            });
        }

        tracing::debug!(
            key,
            page,
            records = result.records.len(),
            total_pages = result.total_pages,
            "fetched page"
        );
        Ok(result)
    }
}

/// Map a raw response onto a decoded page or the matching fault
fn classify_response(key: &str, page: u32, response: TransportResponse) -> Result<PageResult> {
    match response.status {
        _ if response.is_success() => decode_page(key, page, &response.body),
        429 => Err(Error::RateLimited {
            key: key.to_string(),
            page,
            retry_after: response.retry_after,
        }),
        status if TRANSIENT_SERVER_STATUSES.contains(&status) => Err(Error::Server {
            key: key.to_string(),
            page,
            status,
        }),
        status => Err(Error::Http {
            key: key.to_string(),
            page,
            status,
        }),
    }
}
