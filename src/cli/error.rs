//! CLI error types and conversions

use crate::export::ExportError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Export aborted
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
