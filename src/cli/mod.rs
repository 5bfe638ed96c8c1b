//! CLI command implementation

pub mod error;
pub mod export;

pub use error::CliError;
pub use export::{Cli, ExportOutcome};
