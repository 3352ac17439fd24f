//! Vigia, an incremental harvester for the gob.bo trámite catalog.
//!
//! # Usage
//!
//! ```text
//! vigia [--data-dir DIR] [--base-url URL]
//!       [--page-size N] [--concurrency N]
//!       [--max-retries N] [--base-delay-secs N]
//!       [--residual-passes N] [--timeout-secs N]
//! ```
//!
//! One invocation is one harvest run: list the catalog, download details,
//! diff against the previous snapshot, and append to the audit logs under
//! `--data-dir`. Scheduling repeated runs is left to cron or similar.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vigia_harvest::{pipeline, DataPaths, HarvestConfig, HttpCatalogClient};

const DEFAULT_BASE_URL: &str = "https://www.gob.bo/ws/api/portal";

#[derive(Parser, Debug)]
#[command(
    name = "vigia",
    version,
    about = "Harvest the trámite catalog and record changes between runs",
    long_about = None,
)]
struct Cli {
    /// Directory for the snapshot, error set, and audit logs.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Base URL of the portal API.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Rows requested per listing page.
    #[arg(long, default_value_t = 30)]
    page_size: u32,

    /// Maximum detail requests in flight at once.
    #[arg(long, default_value_t = 10)]
    concurrency: usize,

    /// Per-request retries after the initial attempt.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// First retry delay in seconds; doubles per attempt.
    #[arg(long, default_value_t = 1)]
    base_delay_secs: u64,

    /// Whole-batch retry passes over the accumulated failure set.
    #[arg(long, default_value_t = 2)]
    residual_passes: u32,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

impl Cli {
    fn config(&self) -> HarvestConfig {
        HarvestConfig {
            page_size: self.page_size,
            concurrency: self.concurrency,
            max_retries: self.max_retries,
            base_delay: Duration::from_secs(self.base_delay_secs),
            residual_passes: self.residual_passes,
            timeout: Duration::from_secs(self.timeout_secs),
            page_attempt_cap: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let client = HttpCatalogClient::new(cli.base_url.clone(), config.timeout)
        .context("failed to build HTTP client")?;
    let paths = DataPaths::in_dir(&cli.data_dir);

    let summary = pipeline::run(Arc::new(client), &config, &paths)
        .await
        .context("harvest run failed")?;

    println!(
        "✓ harvest complete: {} fetched, {} errored | {} appeared, {} disappeared, {} modified",
        summary.fetched, summary.errored, summary.appeared, summary.disappeared, summary.modified
    );
    Ok(())
}
