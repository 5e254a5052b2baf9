//! batch-publisher: publish generated messages to a topic in concurrent batches.
//!
//! Configuration is read from `.env`, the environment and an optional YAML file;
//! flags override all of them. See `batch-publisher --help`.

use anyhow::{Context, Result};
use batch_publisher::{
    runner, DryRunPublisher, FailureMode, HttpPublisher, PublisherConfig, RemainderPolicy,
    RunSummary,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "batch-publisher", version, about)]
struct Cli {
    /// YAML config file, applied under environment and flags
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Topic identifier (overrides SNS_TOPIC)
    #[arg(long)]
    topic: Option<String>,

    /// Region forwarded to the gateway (overrides AWS_REGION)
    #[arg(long)]
    region: Option<String>,

    /// Credential profile (overrides AWS_PROFILE)
    #[arg(long)]
    profile: Option<String>,

    /// PublishBatch gateway URL (overrides PUBLISH_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Number of messages to generate
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Records per batch (1..=10)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Maximum batches in flight
    #[arg(short, long)]
    max_inflight: Option<usize>,

    /// Trailing partial batch: flush or drop
    #[arg(long)]
    remainder: Option<RemainderPolicy>,

    /// On a failed batch: continue or cancel
    #[arg(long)]
    failure_mode: Option<FailureMode>,

    /// Retries for transient publish errors
    #[arg(long)]
    max_retries: Option<u32>,

    #[arg(long)]
    payload: Option<String>,

    /// Do not contact the endpoint; count batches instead
    #[arg(long)]
    dry_run: bool,

    /// Simulated per-batch latency for --dry-run
    #[arg(long, default_value_t = 0)]
    dry_run_latency_ms: u64,
}

impl Cli {
    fn apply(self, mut config: PublisherConfig) -> PublisherConfig {
        if let Some(v) = self.topic {
            config.topic = v;
        }
        if let Some(v) = self.region {
            config.region = Some(v);
        }
        if let Some(v) = self.profile {
            config.profile = Some(v);
        }
        if let Some(v) = self.endpoint {
            config.endpoint = Some(v);
        }
        if let Some(v) = self.count {
            config.message_count = v;
        }
        if let Some(v) = self.batch_size {
            config.batch.max_batch_size = v;
        }
        if let Some(v) = self.max_inflight {
            config.dispatch.max_inflight = v;
        }
        if let Some(v) = self.remainder {
            config.batch.remainder = v;
        }
        if let Some(v) = self.failure_mode {
            config.dispatch.failure_mode = v;
        }
        if let Some(v) = self.max_retries {
            config.dispatch.retry.max_retries = v;
        }
        if let Some(v) = self.payload {
            config.payload = v;
        }
        config
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(summary: &RunSummary, elapsed: Duration) {
    println!("{:?}", elapsed);
    println!("{}", summary);
    for (index, error) in summary.report.failures().take(10) {
        println!("  batch {}: {}", index, error);
    }
    let more = summary.report.failure_count().saturating_sub(10);
    if more > 0 {
        println!("  ... and {} more failed batches", more);
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<ExitCode> {
    match dotenvy::dotenv() {
        Ok(_) => {}
        // The environment may already be populated.
        Err(e) if e.not_found() => {}
        Err(e) => {
            eprintln!("error: cannot load .env: {}", e);
            return Ok(ExitCode::from(2));
        }
    }
    init_tracing();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let latency = Duration::from_millis(cli.dry_run_latency_ms);
    let config_path = cli.config.clone();

    let config = match PublisherConfig::load(config_path.as_deref()) {
        Ok(base) => cli.apply(base),
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("error: {}", e);
        return Ok(ExitCode::from(2));
    }

    let http = if dry_run {
        None
    } else {
        match HttpPublisher::from_config(&config) {
            Ok(publisher) => Some(Arc::new(publisher)),
            Err(e) if e.is_configuration() => {
                eprintln!("error: {}", e);
                return Ok(ExitCode::from(2));
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context("failed to set up publish client"));
            }
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling batches not yet started");
                cancel.cancel();
            }
        });
    }

    println!("Started process");
    let started = Instant::now();

    let summary = match http {
        Some(publisher) => runner::run_with_cancel(&config, publisher, cancel).await,
        None => {
            let publisher = Arc::new(DryRunPublisher::new().with_latency(latency));
            runner::run_with_cancel(&config, publisher, cancel).await
        }
    }
    .context("publish run failed")?;

    print_summary(&summary, started.elapsed());
    println!("Finished process");

    Ok(if summary.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
