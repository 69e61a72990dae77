//! `vision-worker` binary (§6): claims `OCR_DONE` frames and summarizes
//! them through an HTTP vision model.

use anyhow::{Context, Result};
use clap::Parser;
use recall_db::{DatabaseManager, FrameStatus};
use recall_pipeline::config;
use recall_vision::{HttpVisionModel, VisionWorker, VisionWorkerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "vision-worker", about = "Runs the vision summarization stage of the recall ingestion pipeline")]
struct Cli {
    /// Number of frames claimed per cycle (default 10)
    #[arg(long)]
    batch_size: Option<u32>,

    /// Seconds to sleep between cycles when the queue is empty (default 5.0)
    #[arg(long)]
    poll_interval: Option<f64>,

    /// Vision model name, e.g. `gpt-4o`, `claude-3-5-sonnet-latest` (default "gpt-4o")
    #[arg(long)]
    model: Option<String>,

    /// Custom chat-completions endpoint base URL
    #[arg(long)]
    model_endpoint: Option<String>,

    /// Maximum tokens requested per summary (default 150)
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Seconds to wait between consecutive model calls within a batch (default 0.5)
    #[arg(long)]
    rate_limit_delay: Option<f64>,

    /// Enable debug-level logging
    #[arg(long)]
    verbose: bool,

    /// Optional config.toml override (§4.5)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maintenance mode: reset VISION_PROCESSING rows older than this many
    /// seconds back to OCR_DONE, then exit (§7 category 5)
    #[arg(long)]
    reap_stranded_after: Option<i64>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_config = config::load_config_file(cli.config.as_deref())
        .context("failed to load config file")?;
    let vision_file = file_config.vision_worker.unwrap_or_default();

    let batch_size = cli.batch_size.or(vision_file.batch_size).unwrap_or(10);
    let poll_interval_secs = cli.poll_interval.or(vision_file.poll_interval).unwrap_or(5.0);
    let model = cli.model.or(vision_file.model).unwrap_or_else(|| "gpt-4o".to_string());
    let model_endpoint = cli
        .model_endpoint
        .or(vision_file.model_endpoint)
        .unwrap_or_else(|| "https://api.openai.com".to_string());
    let max_tokens = cli.max_tokens.or(vision_file.max_tokens).unwrap_or(150);
    let rate_limit_delay_secs = cli
        .rate_limit_delay
        .or(vision_file.rate_limit_delay)
        .unwrap_or(0.5);

    anyhow::ensure!(batch_size >= 1, "--batch-size must be >= 1");
    anyhow::ensure!(poll_interval_secs > 0.0, "--poll-interval must be > 0");
    anyhow::ensure!(max_tokens >= 1, "--max-tokens must be >= 1");

    let database_url = config::database_url()?;
    let db = Arc::new(
        DatabaseManager::new(database_url)
            .await
            .context("failed to connect to the database")?,
    );

    if let Some(stale_after) = cli.reap_stranded_after {
        let reaped = db
            .reap_stranded(FrameStatus::VisionProcessing, stale_after)
            .await
            .context("failed to reap stranded VISION_PROCESSING rows")?;
        tracing::info!(count = reaped, "reaped stranded VISION_PROCESSING rows");
        return Ok(());
    }

    let api_key = config::vision_api_key();
    let model_client = Arc::new(HttpVisionModel::new(model_endpoint, model, api_key));

    let worker_config = VisionWorkerConfig {
        batch_size,
        poll_interval: Duration::from_secs_f64(poll_interval_secs),
        max_tokens,
        rate_limit_delay: Duration::from_secs_f64(rate_limit_delay_secs),
        ..VisionWorkerConfig::default()
    };

    let worker = Arc::new(VisionWorker::new(db, model_client, worker_config));

    let ctrlc_worker = worker.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal, finishing in-flight batch");
            ctrlc_worker.stop();
        }
    });

    #[cfg(unix)]
    {
        let sigterm_worker = worker.clone();
        tokio::spawn(async move {
            if let Ok(mut sigterm) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            {
                sigterm.recv().await;
                tracing::info!("received SIGTERM, finishing in-flight batch");
                sigterm_worker.stop();
            }
        });
    }

    worker.start().await.context("vision worker loop failed")?;

    Ok(())
}
