//! Observability metrics for export runs
//!
//! Counters and histograms for API requests, 429 responses, rate-limit
//! pauses and failed fetches. Without a recorder installed every macro call
//! is a no-op; [`init_metrics`] installs a Prometheus exporter whose scrape
//! endpoint lives for the duration of the run.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::fetcher::api_config::Resource;

static METRICS_INITIALIZED: Lazy<RwLock<bool>> = Lazy::new(|| RwLock::new(false));

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Install the Prometheus exporter and register metric descriptions
///
/// Idempotent: later calls return `Ok(())` without reinstalling.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "HTTP requests sent to the assessment API"
    );
    describe_counter!(
        "http_429_responses_total",
        Unit::Count,
        "429 Too Many Requests responses received"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration"
    );
    describe_counter!(
        "rate_limit_pauses_total",
        Unit::Count,
        "Pauses taken because of throttling or exhausted quota"
    );
    describe_histogram!(
        "rate_limit_pause_seconds",
        Unit::Seconds,
        "Length of rate-limit pauses"
    );
    describe_counter!(
        "fetch_failures_total",
        Unit::Count,
        "Paginated fetches interrupted by a local failure"
    );
    describe_counter!(
        "export_rows_total",
        Unit::Count,
        "Question rows written to the output file"
    );

    *initialized = true;
    info!("Metrics endpoint listening on {}", addr);
    Ok(())
}

/// Whether [`init_metrics`] has completed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Next correlation id for request tracing
pub fn next_correlation_id() -> String {
    let n = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{n:08x}")
}

/// Timing and outcome of one HTTP request
pub struct HttpRequestMetrics {
    path: String,
    start_time: Instant,
    correlation_id: String,
}

impl HttpRequestMetrics {
    /// Start timing a request to `path`
    pub fn start(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            start_time: Instant::now(),
            correlation_id: next_correlation_id(),
        }
    }

    /// Record a request that produced a status code
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!("http_requests_total", "status" => status_code.to_string()).increment(1);
        histogram!("http_request_duration_seconds").record(duration.as_secs_f64());

        if status_code == 429 {
            counter!("http_429_responses_total").increment(1);
        }

        debug!(
            correlation_id = %self.correlation_id,
            path = %self.path,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record a request that failed before any status arrived
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!("http_requests_total", "status" => "network_error").increment(1);
        histogram!("http_request_duration_seconds").record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            path = %self.path,
            duration_ms = duration.as_millis() as u64,
            "Network error"
        );
    }

    /// Correlation id of this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a rate-limit pause
pub fn record_rate_limit_pause(reason: &'static str, duration: Duration) {
    counter!("rate_limit_pauses_total", "reason" => reason).increment(1);
    histogram!("rate_limit_pause_seconds", "reason" => reason).record(duration.as_secs_f64());
}

/// Record a paginated fetch that stopped on a local failure
pub fn record_fetch_failure(resource: Resource) {
    counter!("fetch_failures_total", "resource" => resource.as_str()).increment(1);
}

/// Run-level metrics for one export
pub struct ExportMetrics {
    school_id: u64,
    start_time: Instant,
}

impl ExportMetrics {
    /// Start tracking an export for `school_id`
    pub fn start(school_id: u64) -> Self {
        info!(school_id, "Export started");
        Self {
            school_id,
            start_time: Instant::now(),
        }
    }

    /// Record a completed export
    pub fn record_success(&self, rows: u64) {
        counter!("export_rows_total").increment(rows);
        info!(
            school_id = self.school_id,
            rows,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export completed"
        );
    }

    /// Record an aborted export
    pub fn record_failure(&self, reason: &str) {
        error!(
            school_id = self.school_id,
            error = %reason,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export failed"
        );
    }
}
