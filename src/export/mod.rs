//! Export orchestration and rate limiting
//!
//! # Overview
//!
//! 1. **Collection**: [`aggregator::AssessmentExporter`] walks courses →
//!    assignments → exercises → questions through the generic paginator
//! 2. **Rate limiting**: [`rate_limit::RateLimitGovernor`] paces requests from
//!    quota headers and waits out 429 responses
//! 3. **Flattening**: every question becomes one [`crate::QuestionRow`]
//!    carrying its course, exam and exercise attributes
//!
//! # Error Handling
//!
//! Local request failures never surface here: the affected branch of the
//! hierarchy is treated as having no children and the walk continues. Only
//! fatal conditions abort a run:
//! - throttling that outlasts the retry bound
//! - an assignment without `grades_settings`

pub mod aggregator;
pub mod rate_limit;

pub use aggregator::{AssessmentExporter, ExportReport, ExportStats};
pub use rate_limit::{RateLimitGovernor, RateLimitHeaders};

use crate::fetcher::FetcherError;

/// Errors that abort an export run
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Fatal fetch error
    #[error("fetch error: {0}")]
    Fetcher(#[from] FetcherError),

    /// A record lacks a field the export depends on
    #[error("{entity} {id} has no `{field}` field")]
    MissingField {
        /// Record kind (e.g. "assignment")
        entity: &'static str,
        /// Record identifier
        id: u64,
        /// Missing field name
        field: &'static str,
    },
}
