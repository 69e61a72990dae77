//! Database manager implementation
//!
//! Provides the main `DatabaseManager` struct with connection pooling and
//! migration handling against Postgres.

use crate::{DatabaseConfig, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Main database manager with connection pooling and query execution.
pub struct DatabaseManager {
    pool: PgPool,
    #[allow(dead_code)]
    config: DatabaseConfig,
}

impl DatabaseManager {
    /// Create a new database manager with default pool settings and run migrations.
    pub async fn new(url: impl Into<String>) -> Result<Self> {
        let config = DatabaseConfig::new(url);
        Self::with_config(config).await
    }

    /// Create a database manager with custom pool configuration.
    ///
    /// # Arguments
    /// * `config` - `DatabaseConfig` with the connection string and pool settings
    ///
    /// # Returns
    /// Result containing the initialized `DatabaseManager` or an error.
    pub async fn with_config(config: DatabaseConfig) -> Result<Self> {
        tracing::info!(
            "connecting to database (max_connections: {}, min_connections: {})",
            config.max_connections,
            config.min_connections
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| {
                crate::DatabaseError::InitializationError(format!(
                    "failed to create connection pool: {e}"
                ))
            })?;

        let manager = Self { pool, config };

        manager.run_migrations().await?;

        tracing::info!("database initialization complete");

        Ok(manager)
    }

    /// Run database migrations to ensure the schema is current.
    async fn run_migrations(&self) -> Result<()> {
        tracing::info!("running database migrations");
        crate::migrations::run_migrations(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the connection pool for advanced operations.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
