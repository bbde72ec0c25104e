//! Error types for toprated
//!
//! Every fault the pipeline can raise lives in one flat [`Error`] enum. Page-level variants
//! carry the query key and page number they happened on, so whoever finally reports the
//! failure can name the offending request without extra bookkeeping.
//!
//! Whether a fault is worth retrying is decided by the error itself through
//! [`IsRetryable`](crate::retry::IsRetryable), see `retry.rs`.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for toprated operations
pub type Result<T> = std::result::Result<T, Error>;

/// Network-layer fault classification
///
/// Derived from the HTTP client's own error flags when a request never produced a status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkFaultKind {
    /// Could not establish a connection (DNS, refused, TLS handshake)
    Connect,
    /// The per-request or connect timeout elapsed
    Timeout,
    /// Reading or writing on an established connection failed
    Io,
    /// The request itself could not be built or sent (bad URL, redirect loop)
    Request,
}

impl std::fmt::Display for NetworkFaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NetworkFaultKind::Connect => "connect",
            NetworkFaultKind::Timeout => "timeout",
            NetworkFaultKind::Io => "i/o",
            NetworkFaultKind::Request => "request",
        };
        write!(f, "{s}")
    }
}

/// Main error type for toprated
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "retry.max_attempts")
        key: Option<String>,
    },

    /// The HTTP client could not be constructed
    #[error("transport setup failed: {0}")]
    Transport(String),

    /// Connect/read/write/timeout fault before a complete response arrived
    #[error("{kind} error fetching page {page} for '{key}': {message}")]
    Network {
        /// Query key of the failed request
        key: String,
        /// Page number of the failed request
        page: u32,
        /// What part of the exchange failed
        kind: NetworkFaultKind,
        /// Underlying client error text
        message: String,
    },

    /// Transient server-side failure (500, 502, 503, 504)
    #[error("server error {status} on page {page} for '{key}'")]
    Server {
        /// Query key of the failed request
        key: String,
        /// Page number of the failed request
        page: u32,
        /// HTTP status code
        status: u16,
    },

    /// Server-side rate limiting (429)
    #[error("rate limited on page {page} for '{key}'{}", fmt_retry_after(.retry_after))]
    RateLimited {
        /// Query key of the failed request
        key: String,
        /// Page number of the failed request
        page: u32,
        /// Wait requested by the server through `Retry-After`, if any
        retry_after: Option<Duration>,
    },

    /// Any other 4xx/5xx status; never retried
    #[error("HTTP error {status} on page {page} for '{key}'")]
    Http {
        /// Query key of the failed request
        key: String,
        /// Page number of the failed request
        page: u32,
        /// HTTP status code
        status: u16,
    },

    /// The page decoded fine but contained no records (e.g. unknown query key)
    #[error("no data found on page {page} for '{key}'")]
    EmptyPage {
        /// Query key of the empty page
        key: String,
        /// Page number of the empty page
        page: u32,
    },

    /// Malformed body or a record that failed validation
    #[error("failed to decode page {page} for '{key}': {reason}")]
    Decode {
        /// Query key of the failed request
        key: String,
        /// Page number of the failed request
        page: u32,
        /// What was wrong with the body
        reason: String,
    },

    /// A later page disagreed with page 1 about the number of pages
    #[error(
        "inconsistent pagination for '{key}': page {page} reports {actual} total pages, page 1 reported {expected}"
    )]
    InconsistentPagination {
        /// Query key being aggregated
        key: String,
        /// Page that reported the differing value
        page: u32,
        /// `total_pages` reported by page 1
        expected: u32,
        /// `total_pages` reported by `page`
        actual: u32,
    },

    /// The retry loop finished without ever recording a fault
    #[error("operation gave up after {attempts} attempts without a recorded fault")]
    MaxAttemptsExceeded {
        /// Number of attempts the policy allowed
        attempts: u32,
    },

    /// Ranking was asked to choose from an empty record set
    #[error("cannot rank an empty record set")]
    EmptyInput,

    /// I/O error (writing output)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (configuration files, JSON output)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn fmt_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs_f64()),
        None => String::new(),
    }
}

impl Error {
    /// Build a network error from a `reqwest` failure, classifying what went wrong
    pub(crate) fn from_reqwest(key: &str, page: u32, e: &reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            NetworkFaultKind::Timeout
        } else if e.is_connect() {
            NetworkFaultKind::Connect
        } else if e.is_body() || e.is_decode() || e.is_request() {
            NetworkFaultKind::Io
        } else {
            NetworkFaultKind::Request
        };

        Error::Network {
            key: key.to_string(),
            page,
            kind,
            message: e.to_string(),
        }
    }

    /// Machine-readable error code, stable across releases
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config",
            Error::Transport(_) => "transport",
            Error::Network { .. } => "transient_network",
            Error::Server { .. } => "transient_server",
            Error::RateLimited { .. } => "rate_limited",
            Error::Http { .. } => "fatal_http",
            Error::EmptyPage { .. } => "empty_page",
            Error::Decode { .. } => "decode",
            Error::InconsistentPagination { .. } => "inconsistent_pagination",
            Error::MaxAttemptsExceeded { .. } => "max_attempts_exceeded",
            Error::EmptyInput => "empty_input",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
        }
    }

    /// Query key the fault belongs to, if it came from a page fetch
    pub fn key(&self) -> Option<&str> {
        match self {
            Error::Network { key, .. }
            | Error::Server { key, .. }
            | Error::RateLimited { key, .. }
            | Error::Http { key, .. }
            | Error::EmptyPage { key, .. }
            | Error::Decode { key, .. }
            | Error::InconsistentPagination { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Page number the fault belongs to, if it came from a page fetch
    pub fn page(&self) -> Option<u32> {
        match self {
            Error::Network { page, .. }
            | Error::Server { page, .. }
            | Error::RateLimited { page, .. }
            | Error::Http { page, .. }
            | Error::EmptyPage { page, .. }
            | Error::Decode { page, .. }
            | Error::InconsistentPagination { page, .. } => Some(*page),
            _ => None,
        }
    }

    /// HTTP status attached to the fault, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } | Error::Http { status, .. } => Some(*status),
            Error::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether this is a configuration problem rather than a runtime fault
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }
}
