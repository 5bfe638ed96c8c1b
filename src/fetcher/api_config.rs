//! API configuration
//!
//! Everything that differs between deployments (base URL, school, token,
//! page size, timeouts) lives in [`ApiConfig`], which is handed to the
//! transport and paginator at construction. Endpoint shapes live in
//! [`Resource`].

use std::fmt;
use std::time::Duration;

use super::{FetcherError, FetcherResult};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://ans.uva.nl/api/v2";

/// Default number of items requested per page
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Largest page size accepted by the API
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Default number of 429 responses tolerated for one page before giving up
pub const DEFAULT_MAX_THROTTLE_RETRIES: u32 = 20;

/// HTTP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one export run against the API
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL without trailing slash (e.g. <https://ans.uva.nl/api/v2>)
    pub base_url: String,
    /// School whose courses are exported
    pub school_id: u64,
    /// Bearer token
    pub token: String,
    /// Items per page
    pub page_limit: usize,
    /// 429 responses tolerated per page; `None` retries forever
    pub max_throttle_retries: Option<u32>,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Create a configuration with default paging and timeouts
    pub fn new(base_url: impl Into<String>, school_id: u64, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            school_id,
            token: token.into(),
            page_limit: DEFAULT_PAGE_LIMIT,
            max_throttle_retries: Some(DEFAULT_MAX_THROTTLE_RETRIES),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the page size
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Set the 429 retry bound (`None` = unbounded)
    pub fn with_max_throttle_retries(mut self, max: Option<u32>) -> Self {
        self.max_throttle_retries = max;
        self
    }

    /// Set the whole-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Reject configurations that cannot produce a single valid request
    pub fn validate(&self) -> FetcherResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(FetcherError::InvalidConfig("base URL is empty".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(FetcherError::InvalidConfig("API token is empty".to_string()));
        }
        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(FetcherError::InvalidConfig(format!(
                "page limit must be between 1 and {MAX_PAGE_LIMIT}, got {}",
                self.page_limit
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("school_id", &self.school_id)
            .field("token", &"<redacted>")
            .field("page_limit", &self.page_limit)
            .field("max_throttle_retries", &self.max_throttle_retries)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Paginated resource levels of the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// `/schools/{school_id}/courses`
    Courses,
    /// `/courses/{course_id}/assignments`
    Assignments,
    /// `/assignments/{assignment_id}/exercises`
    Exercises,
    /// `/exercises/{exercise_id}/questions`
    Questions,
}

impl Resource {
    /// Request path for the children of `parent_id`
    pub fn path(self, parent_id: u64) -> String {
        match self {
            Resource::Courses => format!("/schools/{parent_id}/courses"),
            Resource::Assignments => format!("/courses/{parent_id}/assignments"),
            Resource::Exercises => format!("/assignments/{parent_id}/exercises"),
            Resource::Questions => format!("/exercises/{parent_id}/questions"),
        }
    }

    /// Resource name used in logs and metric labels
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Courses => "courses",
            Resource::Assignments => "assignments",
            Resource::Exercises => "exercises",
            Resource::Questions => "questions",
        }
    }

    /// Kind of record the parent id refers to
    pub fn parent_kind(self) -> &'static str {
        match self {
            Resource::Courses => "school",
            Resource::Assignments => "course",
            Resource::Exercises => "assignment",
            Resource::Questions => "exercise",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
