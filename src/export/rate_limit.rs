//! Rate-limit governor
//!
//! The API reports its quota through three response headers:
//!
//! - `RateLimit-Remaining` - requests left for this token
//! - `RateLimit-School-Remaining` - requests left for the whole school
//! - `RateLimit-Reset` - seconds until the quota window resets
//!
//! [`RateLimitGovernor`] pauses proactively when either counter reaches zero
//! and reactively when a request is answered with 429. The governor is
//! shared by every fetch of a run and remembers when the current pause ends,
//! so concurrent fetches never send a request inside another fetch's pause.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::header::HeaderMap;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::metrics::record_rate_limit_pause;

/// Requests left for the token
pub const HEADER_REMAINING: &str = "ratelimit-remaining";

/// Requests left for the school
pub const HEADER_SCHOOL_REMAINING: &str = "ratelimit-school-remaining";

/// Seconds until the quota window resets
pub const HEADER_RESET: &str = "ratelimit-reset";

/// Remaining count assumed when a counter header is absent or malformed
pub const DEFAULT_REMAINING: u64 = 1;

/// Reset delay assumed when `RateLimit-Reset` is absent or malformed
pub const DEFAULT_RESET_SECS: u64 = 10;

/// Quota information parsed from one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// Requests left for the token
    pub remaining: u64,
    /// Requests left for the school
    pub school_remaining: u64,
    /// Time until the window resets
    pub reset: Duration,
}

impl Default for RateLimitHeaders {
    fn default() -> Self {
        Self {
            remaining: DEFAULT_REMAINING,
            school_remaining: DEFAULT_REMAINING,
            reset: Duration::from_secs(DEFAULT_RESET_SECS),
        }
    }
}

impl RateLimitHeaders {
    /// Parse the rate-limit headers, falling back to defaults per header
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            remaining: parse_header(headers, HEADER_REMAINING).unwrap_or(DEFAULT_REMAINING),
            school_remaining: parse_header(headers, HEADER_SCHOOL_REMAINING)
                .unwrap_or(DEFAULT_REMAINING),
            reset: Duration::from_secs(
                parse_header(headers, HEADER_RESET).unwrap_or(DEFAULT_RESET_SECS),
            ),
        }
    }

    /// Whether either quota counter has run out
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0 || self.school_remaining == 0
    }
}

fn parse_header(headers: &HeaderMap, name: &str) -> Option<u64> {
    let raw = headers.get(name)?.to_str().ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring malformed {} header '{}': {}", name, raw, e);
            None
        }
    }
}

/// Why a pause was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Server answered 429
    Throttled,
    /// Quota headers reported zero remaining requests
    QuotaExhausted,
}

impl PauseReason {
    /// Label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            PauseReason::Throttled => "throttled",
            PauseReason::QuotaExhausted => "quota_exhausted",
        }
    }
}

/// Shared pacing state for all requests of a run
#[derive(Debug, Default)]
pub struct RateLimitGovernor {
    resume_at: Mutex<Option<Instant>>,
}

impl RateLimitGovernor {
    /// Create a governor with no pause in effect
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until any pause recorded by another request has ended
    ///
    /// The window is re-read after every wake-up: a pause taken while this
    /// call was sleeping extends the wait.
    pub async fn wait_ready(&self) {
        loop {
            let deadline = *self.resume_at.lock().unwrap_or_else(PoisonError::into_inner);
            match deadline {
                Some(deadline) if deadline > Instant::now() => {
                    debug!("Waiting for shared rate-limit pause to end");
                    sleep_until(deadline).await;
                }
                _ => return,
            }
        }
    }

    /// Inspect the quota of a successful response and pause if it is spent
    ///
    /// Returns the pause taken, if any.
    pub async fn observe(&self, quota: &RateLimitHeaders) -> Option<Duration> {
        if !quota.is_exhausted() {
            return None;
        }
        warn!(
            remaining = quota.remaining,
            school_remaining = quota.school_remaining,
            "Rate limit reached. Sleeping for {} seconds...",
            quota.reset.as_secs()
        );
        self.pause(quota.reset, PauseReason::QuotaExhausted).await;
        Some(quota.reset)
    }

    /// Suspend for `delay` and make every other request wait as well
    pub async fn pause(&self, delay: Duration, reason: PauseReason) {
        let deadline = {
            let mut resume_at = self.resume_at.lock().unwrap_or_else(PoisonError::into_inner);
            let candidate = Instant::now() + delay;
            let deadline = match *resume_at {
                Some(existing) if existing > candidate => existing,
                _ => candidate,
            };
            *resume_at = Some(deadline);
            deadline
        };

        record_rate_limit_pause(reason.as_str(), delay);
        sleep_until(deadline).await;
    }
}
