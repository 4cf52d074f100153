use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use orders_load::{IterationDriver, RunConfig, DEFAULT_STAGES};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use surge::core::{Stage, DEFAULT_START_VUS};
use surge::prelude::*;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "orders_load=info,surge=info";

/// Staged load test against the orders and user-auth API.
///
/// The target is read from `BASE_URL` (default `http://localhost:8000`) and the bearer token
/// from `ACCESS_TOKEN` (default empty).
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Ramp stage as <duration>:<target>, e.g. `30s:20`. Repeat to build a ramp; replaces the
    /// default 10s:10, 30s:20, 2m:50, 10s:0.
    #[arg(short, long = "stage", value_name = "DURATION:TARGET")]
    stages: Vec<Stage>,

    /// VU count the first stage ramps from.
    #[arg(long, default_value_t = DEFAULT_START_VUS)]
    start_vus: usize,

    /// Time in-flight iterations may run once the last stage ends.
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    graceful_stop: Duration,

    /// Delay at the end of each iteration.
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    pace: Duration,

    /// Write the run summary to this file as JSON.
    #[arg(long, value_name = "PATH")]
    summary_export: Option<PathBuf>,

    /// Serve Prometheus metrics on this address while the test runs.
    #[arg(long, value_name = "ADDR")]
    prometheus: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(RunConfig::from_env()?);

    if let Some(addr) = cli.prometheus {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing the Prometheus exporter")?;
        info!("Serving metrics on {addr}");
    }

    let stages = if cli.stages.is_empty() {
        DEFAULT_STAGES.to_vec()
    } else {
        cli.stages
    };

    info!(
        "Targeting {} ({} token)",
        config.base_url(),
        if config.token().is_empty() { "no" } else { "with" }
    );

    let driver = IterationDriver::new(IterationDriver::client()?, config).pace(cli.pace);
    let stats = Scenario::new("orders", move || {
        let driver = driver.clone();
        async move {
            driver.run_iteration().await;
        }
    })
    .start_vus(cli.start_vus)
    .stages(stages)
    .graceful_stop(cli.graceful_stop)
    .await;

    println!("{stats}");

    if let Some(path) = cli.summary_export {
        let json = serde_json::to_vec_pretty(&stats)?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing summary to {}", path.display()))?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}
