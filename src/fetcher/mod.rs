//! API access: configuration, HTTP transport and pagination

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

pub mod api_config;
pub mod http;
pub mod lenient;
pub mod pagination;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-success HTTP status other than 429
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Connection failure, timeout or unreadable body
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response body was not the expected JSON array
    #[error("parse error: {0}")]
    ParseError(String),

    /// Page counter ran past the safety cap
    #[error("pagination limit reached: {0}")]
    PaginationLimit(String),

    /// The server kept answering 429 beyond the configured bound
    #[error("still throttled after {attempts} attempts on {path} page {page}")]
    ThrottleRetriesExhausted {
        /// Request path
        path: String,
        /// Page number being retried
        page: u32,
        /// Number of 429 responses received for this page
        attempts: u32,
    },

    /// Invalid API configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FetcherError {
    /// Whether this error aborts the whole run instead of only the current fetch
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FetcherError::ThrottleRetriesExhausted { .. } | FetcherError::InvalidConfig(_)
        )
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Raw answer to a single page request
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers (rate-limit headers are read from here)
    pub headers: HeaderMap,
    /// Response body
    pub body: String,
}

/// Transport used by the paginator to issue GET requests
///
/// Implementations return every HTTP status as a [`PageResponse`]; only
/// failures that produce no response at all (connection refused, timeout)
/// are reported as errors. Status handling belongs to the paginator.
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Issue a GET request for `path` (relative to the base URL) with query parameters
    async fn get(&self, path: &str, query: &[(&str, String)]) -> FetcherResult<PageResponse>;

    /// Base URL requests are resolved against
    fn base_url(&self) -> &str;
}
