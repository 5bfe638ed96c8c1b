//! Main entry point for the assessment-exporter CLI

use assessment_exporter::cli::Cli;
use assessment_exporter::metrics;
use assessment_exporter::shutdown::ShutdownCoordinator;
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("assessment_exporter=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = metrics::init_metrics(addr).await {
            warn!("Metrics disabled: {}", e);
        }
    }

    // Ctrl+C stops the walk early; collected rows are still written
    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() && shutdown.request_shutdown() {
                warn!("Ctrl+C received - finishing with the rows collected so far...");
            }
        }
    });

    match cli.execute(shutdown).await {
        Ok(outcome) => {
            let stats = &outcome.stats;
            println!(
                "Exported {} rows to {} ({} courses, {} assignments, {} exercises, {} failed fetches{})",
                outcome.rows_written,
                outcome.path.display(),
                stats.courses,
                stats.assignments,
                stats.exercises,
                stats.failed_fetches,
                if stats.cancelled { ", interrupted" } else { "" }
            );
        }
        Err(e) => {
            error!("Export failed: {}", e);
            std::process::exit(1);
        }
    }
}
