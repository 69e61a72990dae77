//! `ocr-worker` binary (§6): claims `PENDING` frames and runs them through
//! a local Tesseract installation.

use anyhow::{Context, Result};
use clap::Parser;
use recall_db::{DatabaseManager, FrameStatus};
use recall_ocr::{OcrWorker, OcrWorkerConfig, TesseractEngine};
use recall_pipeline::config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ocr-worker", about = "Runs the OCR stage of the recall ingestion pipeline")]
struct Cli {
    /// Number of frames claimed per cycle (default 10)
    #[arg(long)]
    batch_size: Option<u32>,

    /// Seconds to sleep between cycles when the queue is empty (default 5.0)
    #[arg(long)]
    poll_interval: Option<f64>,

    /// Tesseract language code, e.g. `eng`, `eng+spa` (default "eng")
    #[arg(long)]
    lang: Option<String>,

    /// Enable debug-level logging
    #[arg(long)]
    verbose: bool,

    /// Optional config.toml override (§4.5)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maintenance mode: reset OCR_PROCESSING rows older than this many
    /// seconds back to PENDING, then exit (§7 category 5)
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
    let ocr_file = file_config.ocr_worker.unwrap_or_default();

    let batch_size = cli.batch_size.or(ocr_file.batch_size).unwrap_or(10);
    let poll_interval_secs = cli.poll_interval.or(ocr_file.poll_interval).unwrap_or(5.0);
    let lang = cli.lang.or(ocr_file.lang).unwrap_or_else(|| "eng".to_string());

    anyhow::ensure!(batch_size >= 1, "--batch-size must be >= 1");
    anyhow::ensure!(poll_interval_secs > 0.0, "--poll-interval must be > 0");

    let database_url = config::database_url()?;
    let db = Arc::new(
        DatabaseManager::new(database_url)
            .await
            .context("failed to connect to the database")?,
    );

    if let Some(stale_after) = cli.reap_stranded_after {
        let reaped = db
            .reap_stranded(FrameStatus::OcrProcessing, stale_after)
            .await
            .context("failed to reap stranded OCR_PROCESSING rows")?;
        tracing::info!(count = reaped, "reaped stranded OCR_PROCESSING rows");
        return Ok(());
    }

    let engine = Arc::new(TesseractEngine::new(lang.clone(), String::new()));
    let worker_config = OcrWorkerConfig {
        batch_size,
        poll_interval: Duration::from_secs_f64(poll_interval_secs),
        lang,
        ..OcrWorkerConfig::default()
    };

    let worker = Arc::new(OcrWorker::new(db, engine, worker_config));

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

    worker.start().await.context("OCR worker loop failed")?;

    Ok(())
}
