//! Export command implementation

use crate::export::{AssessmentExporter, ExportStats};
use crate::fetcher::api_config::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::fetcher::http::ApiHttpClient;
use crate::metrics::ExportMetrics;
use crate::output::write_rows_to;
use crate::shutdown::SharedShutdown;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::CliError;

/// Maximum number of courses fetched at once
const MAX_CONCURRENCY: usize = 8;

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Parse and validate the page size
fn parse_page_limit(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 || value > MAX_PAGE_LIMIT {
        return Err(format!("page limit must be between 1 and {MAX_PAGE_LIMIT}"));
    }
    Ok(value)
}

/// Parse a single-byte field delimiter (`tab` or `\t` for tabs)
fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "tab" | "\\t" | "\t" => return Ok(b'\t'),
        _ => {}
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => Ok(c as u8),
        _ => Err(format!("delimiter must be a single ASCII character, got '{s}'")),
    }
}

/// Assessment exporter CLI
#[derive(Parser, Debug)]
#[command(name = "assessment-exporter")]
#[command(
    about = "Export courses, exams, exercises and questions of a school to a spreadsheet",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// API base URL
    #[arg(long, env = "ANS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// School whose courses are exported
    #[arg(long, env = "ANS_SCHOOL_ID")]
    pub school_id: u64,

    /// API bearer token
    #[arg(long, env = "ANS_API_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Items requested per page (1-1000)
    #[arg(long, env = "ANS_PAGE_LIMIT", default_value_t = DEFAULT_PAGE_LIMIT, value_parser = parse_page_limit)]
    pub page_limit: usize,

    /// Output spreadsheet: `.xlsx` writes an Excel workbook, anything else CSV
    #[arg(short, long, env = "ANS_OUTPUT", default_value = "assessment_export.xlsx")]
    pub output: PathBuf,

    /// Field delimiter for CSV output (e.g. ";" or "tab")
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Number of courses fetched concurrently (default: 1, max: 8)
    ///
    /// All concurrent fetches share one rate-limit view: a pause triggered by
    /// any request holds back every other request until it ends.
    #[arg(long, default_value = "1", value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// 429 responses tolerated for one page before aborting (0 = retry forever)
    #[arg(long, default_value_t = 20)]
    pub max_throttle_retries: u32,

    /// Whole-request timeout in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub request_timeout_secs: u64,

    /// Serve Prometheus metrics on this address while the export runs
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Hide the progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

/// Result of a finished export
#[derive(Debug)]
pub struct ExportOutcome {
    /// File the rows were written to
    pub path: PathBuf,
    /// Number of data rows written
    pub rows_written: u64,
    /// Run counters
    pub stats: ExportStats,
}

impl Cli {
    /// Build the API configuration from the parsed arguments
    pub fn api_config(&self) -> Result<ApiConfig, CliError> {
        let max_throttle_retries = match self.max_throttle_retries {
            0 => None,
            n => Some(n),
        };

        let config = ApiConfig::new(self.base_url.clone(), self.school_id, self.token.clone())
            .with_page_limit(self.page_limit)
            .with_max_throttle_retries(max_throttle_retries)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs));

        config
            .validate()
            .map_err(|e| CliError::ConfigurationError(e.to_string()))?;
        Ok(config)
    }

    /// Run the export and write the output file
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<ExportOutcome, CliError> {
        let config = self.api_config()?;
        info!(?config, "Starting export");

        let transport = Arc::new(ApiHttpClient::new(&config)?);
        let exporter = AssessmentExporter::new(transport, &config)
            .with_concurrency(self.concurrency)
            .with_shutdown(shutdown)
            .with_progress(self.progress_bar());

        let metrics = ExportMetrics::start(config.school_id);
        let report = match exporter.collect().await {
            Ok(report) => report,
            Err(e) => {
                metrics.record_failure(&e.to_string());
                return Err(e.into());
            }
        };

        let rows_written = write_rows_to(&self.output, &report.rows, self.delimiter)?;
        metrics.record_success(rows_written);

        Ok(ExportOutcome {
            path: self.output.clone(),
            rows_written,
            stats: report.stats,
        })
    }

    fn progress_bar(&self) -> ProgressBar {
        if self.no_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} courses {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}
