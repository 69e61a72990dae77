//! OCR stage of the recall ingestion pipeline
//!
//! Advances frames from `PENDING` to `OCR_DONE` or `ERROR` (§4.2): resolves
//! each frame's `image_ref` to bytes, runs it through a local Tesseract
//! installation, and commits the outcome back to the database via the
//! claim protocol in `recall_db`.
//!
//! # Example
//!
//! ```no_run
//! use recall_db::DatabaseManager;
//! use recall_ocr::{OcrWorker, OcrWorkerConfig, TesseractEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseManager::new("postgres://localhost/recall").await?);
//!     let engine = Arc::new(TesseractEngine::new("eng".to_string(), String::new()));
//!     let worker = OcrWorker::new(db, engine, OcrWorkerConfig::default());
//!
//!     worker.start().await?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod engine;
pub mod image_loader;
pub mod worker;

pub use engine::{OcrEngine, TesseractEngine};
pub use image_loader::{load_image, ImageLoadError};
pub use worker::{OcrWorker, OcrWorkerConfig};

/// Errors surfaced by the OCR engine adapter.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine not installed or not reachable: {0}")]
    EngineUnavailable(String),

    #[error("OCR recognition failed: {0}")]
    RecognitionFailed(String),
}

/// Result type alias for OCR adapter operations.
pub type Result<T> = std::result::Result<T, OcrError>;
