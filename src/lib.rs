//! # toprated
//!
//! Fetches every page of a paginated ratings API, riding out transient network and server
//! faults, and picks the records tied at the highest rating.
//!
//! ## Pipeline
//!
//! - [`transport`] - pooled HTTP client with a hard in-flight ceiling
//! - [`retry`] - fault classification and backoff (exponential or `Retry-After`)
//! - [`fetcher`] - one page: request, classify, decode, retry
//! - [`aggregator`] - page 1, then the remaining pages concurrently, fail-fast
//! - [`ranking`] - deterministic top-N among the maximum-rating ties
//!
//! ## Quick Start
//!
//! ```no_run
//! use toprated::{Config, RatingsClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RatingsClient::new(Config::default())?;
//!
//!     for name in client.top_rated("denver", 5).await? {
//!         println!("{name}");
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

use std::sync::Arc;

/// Page aggregation across a whole query
pub mod aggregator;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Single page fetching
pub mod fetcher;
/// Top-rated selection
pub mod ranking;
/// Retry logic with exponential backoff
pub mod retry;
/// HTTP transport
pub mod transport;
/// Core data types
pub mod types;

// Re-export commonly used types
pub use aggregator::Aggregator;
pub use config::{ApiConfig, Config, QueryConfig, RetryConfig};
pub use error::{Error, NetworkFaultKind, Result};
pub use fetcher::PageFetcher;
pub use ranking::top_tied;
pub use retry::{IsRetryable, RetryPolicy};
pub use transport::{HttpTransport, PooledTransport, TransportResponse};
pub use types::{PageResult, Record};

/// Scoped handle on the whole pipeline
///
/// Owns the connection pool: build one per process (or per test) and drop it when done.
/// Overlapping calls on the same client share its connection ceiling.
#[derive(Clone)]
pub struct RatingsClient {
    aggregator: Aggregator,
}

impl RatingsClient {
    /// Validate `config` and build the transport it describes
    ///
    /// # Errors
    /// [`Error::Config`] for invalid settings, [`Error::Transport`] if the HTTP client
    /// cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = PooledTransport::new(&config.api)?;
        Ok(Self::with_transport(Arc::new(transport), config.retry))
    }

    /// Build a client over any transport, e.g. an in-memory one for fault injection
    pub fn with_transport(transport: Arc<dyn HttpTransport>, retry: RetryConfig) -> Self {
        let fetcher = PageFetcher::new(transport, RetryPolicy::new(retry));
        Self {
            aggregator: Aggregator::new(fetcher),
        }
    }

    /// Every record for `key`, in page order
    pub async fn fetch_all(&self, key: &str) -> Result<Vec<Record>> {
        self.aggregator.fetch_all(key).await
    }

    /// Names of up to `limit` records sharing the highest rating for `key`
    pub async fn top_rated(&self, key: &str, limit: usize) -> Result<Vec<String>> {
        let records = self.fetch_all(key).await?;
        top_tied(&records, limit)
    }
}
