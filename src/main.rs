//! Courier batch webhook delivery.
//!
//! Reads notifications from a delimited file and delivers each one to its
//! destination, retrying failures with exponential backoff. The input path
//! defaults to `webhooks.txt` and may be given as the first argument.

use std::path::PathBuf;

use anyhow::{Context, Result};
use courier_core::load_notifications;
use courier_delivery::RetryScheduler;
use tracing::{info, warn};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let mut config = Config::load()?;
    if let Some(path) = std::env::args_os().nth(1) {
        config.input_path = PathBuf::from(path);
    }
    info!(
        input = %config.input_path.display(),
        max_delay_time = config.max_delay_time,
        initial_delay_time = config.initial_delay_time,
        backoff_factor = config.exponential_backoff_factor,
        max_url_failure = config.max_url_failure,
        response_timeout = config.response_timeout,
        "configuration loaded"
    );

    let notifications = load_notifications(&config.input_path)
        .with_context(|| format!("failed to read {}", config.input_path.display()))?;

    let mut scheduler = RetryScheduler::with_http_client(config.to_scheduler_config()?)
        .context("failed to create retry scheduler")?;

    scheduler.process(notifications).await;

    let stats = scheduler.stats();
    for (destination, failures) in scheduler.failure_counts() {
        warn!(%destination, failures, "destination had abandoned deliveries");
    }
    info!(
        notifications = stats.notifications,
        attempts = stats.attempts,
        delivered = stats.delivered,
        abandoned = stats.abandoned,
        skipped = stats.skipped,
        "courier run complete"
    );

    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("info,courier=debug").context("invalid default log filter")?,
    };

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}
