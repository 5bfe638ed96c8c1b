//! Page-numbered pagination over the assessment API
//!
//! Every resource level uses the same scheme: `?limit=L&page=N` with pages
//! numbered from 1. A page holding fewer than `L` items is the last one; a
//! full page always triggers a request for the next page, so a total that is
//! an exact multiple of `L` ends on an empty page.
//!
//! Includes:
//! - 429 handling: wait `RateLimit-Reset` seconds and retry the same page,
//!   bounded by the configured retry limit
//! - Quota pacing through the shared [`RateLimitGovernor`] before the next
//!   page of the same fetch
//! - A page-count cap against runaway loops

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::export::rate_limit::{PauseReason, RateLimitGovernor, RateLimitHeaders};
use crate::fetcher::api_config::{ApiConfig, Resource};
use crate::fetcher::{FetcherError, FetcherResult, PageTransport};
use crate::metrics::record_fetch_failure;

/// Maximum number of pages fetched for one parent
pub const MAX_PAGES: u32 = 10_000;

/// Outcome of a paginated fetch
///
/// A local failure does not discard what was already received; the caller
/// decides whether a truncated list is usable.
#[derive(Debug)]
pub struct Paginated<T> {
    /// Items in fetch order
    pub items: Vec<T>,
    /// Number of pages received successfully
    pub pages: u32,
    /// Failure that cut the fetch short, if any
    pub interrupted: Option<FetcherError>,
}

impl<T> Paginated<T> {
    /// Whether the last page was reached
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }

    /// Items received before any interruption
    pub fn into_partial(self) -> Vec<T> {
        self.items
    }
}

/// Generic paginated fetcher
pub struct Paginator {
    transport: Arc<dyn PageTransport>,
    governor: Arc<RateLimitGovernor>,
    page_limit: usize,
    max_throttle_retries: Option<u32>,
}

impl Paginator {
    /// Create a paginator
    ///
    /// # Arguments
    /// * `transport` - Transport issuing the GET requests
    /// * `governor` - Rate-limit state shared by every fetch of the run
    /// * `config` - Supplies page size and 429 retry bound
    pub fn new(
        transport: Arc<dyn PageTransport>,
        governor: Arc<RateLimitGovernor>,
        config: &ApiConfig,
    ) -> Self {
        Self {
            transport,
            governor,
            page_limit: config.page_limit,
            max_throttle_retries: config.max_throttle_retries,
        }
    }

    /// Base URL of the underlying transport
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Fetch every page of `resource` under `parent_id`
    ///
    /// # Returns
    /// All items in page order, plus the local failure that stopped the
    /// fetch early, if any.
    ///
    /// # Errors
    /// Only fatal errors (see [`FetcherError::is_fatal`]) are returned as `Err`.
    pub async fn fetch_all<T>(&self, resource: Resource, parent_id: u64) -> FetcherResult<Paginated<T>>
    where
        T: DeserializeOwned,
    {
        let path = resource.path(parent_id);
        let mut items = Vec::new();
        let mut page: u32 = 1;

        let interrupted = loop {
            if page > MAX_PAGES {
                break Some(FetcherError::PaginationLimit(format!(
                    "{path} exceeded {MAX_PAGES} pages"
                )));
            }

            match self.fetch_page::<T>(&path, page).await {
                Ok((batch, quota)) => {
                    let count = batch.len();
                    items.extend(batch);
                    debug!(
                        resource = %resource,
                        parent_id,
                        page,
                        count,
                        "Fetched {} {} from page {}",
                        count,
                        resource,
                        page
                    );

                    if count < self.page_limit {
                        break None;
                    }
                    // Quota pacing only matters when another page follows
                    self.governor.observe(&quota).await;
                    page += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        resource = %resource,
                        parent_id,
                        page,
                        "Error fetching {} for {} {} on page {}: {}",
                        resource,
                        resource.parent_kind(),
                        parent_id,
                        page,
                        e
                    );
                    record_fetch_failure(resource);
                    break Some(e);
                }
            }
        };

        let pages = if interrupted.is_some() { page - 1 } else { page };
        Ok(Paginated {
            items,
            pages,
            interrupted,
        })
    }

    /// Fetch one page, waiting out 429 responses
    ///
    /// Returns the items together with the quota headers of the response.
    async fn fetch_page<T>(
        &self,
        path: &str,
        page: u32,
    ) -> FetcherResult<(Vec<T>, RateLimitHeaders)>
    where
        T: DeserializeOwned,
    {
        let query = [
            ("limit", self.page_limit.to_string()),
            ("page", page.to_string()),
        ];
        let mut throttled: u32 = 0;

        loop {
            self.governor.wait_ready().await;

            let response = self.transport.get(path, &query).await?;
            let quota = RateLimitHeaders::from_headers(&response.headers);

            if response.status == StatusCode::TOO_MANY_REQUESTS {
                throttled += 1;
                if let Some(max) = self.max_throttle_retries {
                    if throttled > max {
                        return Err(FetcherError::ThrottleRetriesExhausted {
                            path: path.to_string(),
                            page,
                            attempts: throttled,
                        });
                    }
                }

                warn!(
                    path,
                    page,
                    attempt = throttled,
                    "Rate limit exceeded. Waiting {} seconds before retrying...",
                    quota.reset.as_secs()
                );
                self.governor.pause(quota.reset, PauseReason::Throttled).await;
                continue;
            }

            if !response.status.is_success() {
                return Err(FetcherError::HttpError(format!(
                    "GET {path} page {page} returned {}",
                    response.status
                )));
            }

            let batch: Vec<T> = serde_json::from_str(&response.body).map_err(|e| {
                FetcherError::ParseError(format!("GET {path} page {page}: {e}"))
            })?;

            return Ok((batch, quota));
        }
    }
}
