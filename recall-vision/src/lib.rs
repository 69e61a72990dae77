//! Vision summarization stage of the recall ingestion pipeline
//!
//! Advances frames from `OCR_DONE` to `VISION_DONE` or `ERROR` (§4.3): loads
//! each frame's image, encodes it as a data URI, sends a single
//! chat-completion request carrying the OCR text and the image, and commits
//! the model's summary back to the database.
//!
//! # Example
//!
//! ```no_run
//! use recall_db::DatabaseManager;
//! use recall_vision::{HttpVisionModel, VisionWorker, VisionWorkerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseManager::new("postgres://localhost/recall").await?);
//!     let model = Arc::new(HttpVisionModel::new(
//!         "https://api.openai.com".to_string(),
//!         "gpt-4o".to_string(),
//!         std::env::var("VISION_API_KEY").ok(),
//!     ));
//!     let worker = VisionWorker::new(db, model, VisionWorkerConfig::default());
//!
//!     worker.start().await?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod client;
pub mod image_encoding;
pub mod prompt;
pub mod worker;

pub use client::{HttpVisionModel, VisionModel};
pub use image_encoding::{to_data_uri, ImageEncodeError};
pub use worker::{VisionWorker, VisionWorkerConfig};

/// Errors surfaced by the vision model adapter. The adapter's contract
/// (§4.4) does not distinguish auth, rate-limit, timeout, or unknown-model
/// failures - all of them surface as a single adapter error.
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("vision model request failed: {0}")]
    RequestFailed(String),

    #[error("vision model returned an unexpected response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for vision adapter operations.
pub type Result<T> = std::result::Result<T, VisionError>;
