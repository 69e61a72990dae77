//! Database crate for the recall ingestion pipeline
//!
//! Provides Postgres access for the `frames` / `ocr_text` tables: connection
//! pooling, schema migrations, and the batched claim protocol (§4.1) that
//! both workers use to reserve frames without double-processing them.
//!
//! # Architecture
//!
//! - `DatabaseManager`: main interface for database operations
//! - Connection pooling via `sqlx::PgPool`
//! - `FrameStatus`: tagged wrapper around the `vision_status` integer column
//! - Automatic schema migrations on startup
//!
//! # Example
//!
//! ```no_run
//! use recall_db::{DatabaseManager, FrameStatus};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = DatabaseManager::new("postgres://localhost/recall").await?;
//!
//!     let claimed = db.claim_frames(FrameStatus::Pending, FrameStatus::OcrProcessing, 10).await?;
//!     for frame in claimed {
//!         println!("claimed frame {}", frame.id);
//!     }
//!
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod db;
pub mod migrations;
pub mod models;
pub mod queries;

pub use db::DatabaseManager;
pub use models::{
    DatabaseConfig, FrameRecord, FrameStatus, NewFrame, OcrOutcome, OcrTextRecord, VisionOutcome,
};

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("database initialization failed: {0}")]
    InitializationError(String),

    #[error("migration failed: {0}")]
    MigrationError(String),

    #[error("query failed: {0}")]
    QueryError(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
