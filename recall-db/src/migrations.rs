//! Database migrations
//!
//! Manages application of SQL migrations to ensure schema consistency.
//! Migrations are applied in order and tracked in the `_migrations` table.

use sqlx::PgPool;

/// Run all database migrations.
pub async fn run_migrations(pool: &PgPool) -> crate::Result<()> {
    tracing::debug!("initializing migrations table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        crate::DatabaseError::MigrationError(format!("failed to create migrations table: {e}"))
    })?;

    apply_migration(pool, "001_frames_and_ocr_text", MIGRATION_001_INITIAL).await?;

    tracing::info!("all migrations completed successfully");
    Ok(())
}

/// Apply a single migration if not already applied.
async fn apply_migration(pool: &PgPool, name: &str, sql: &str) -> crate::Result<()> {
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            crate::DatabaseError::MigrationError(format!(
                "failed to check migration status for {name}: {e}"
            ))
        })?;

    if exists == 0 {
        tracing::info!("applying migration: {}", name);

        let mut tx = pool.begin().await.map_err(|e| {
            crate::DatabaseError::MigrationError(format!("failed to begin transaction: {e}"))
        })?;

        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            crate::DatabaseError::MigrationError(format!(
                "failed to execute migration {name}: {e}"
            ))
        })?;

        sqlx::query("INSERT INTO _migrations (name) VALUES ($1)")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                crate::DatabaseError::MigrationError(format!(
                    "failed to record migration {name}: {e}"
                ))
            })?;

        tx.commit().await.map_err(|e| {
            crate::DatabaseError::MigrationError(format!("failed to commit migration: {e}"))
        })?;
    } else {
        tracing::debug!("migration already applied: {}", name);
    }

    Ok(())
}

const MIGRATION_001_INITIAL: &str = r#"
CREATE EXTENSION IF NOT EXISTS "pgcrypto";

CREATE TABLE IF NOT EXISTS frames (
    id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    captured_at timestamptz NOT NULL,
    image_ref text NOT NULL,
    window_title text,
    app_name text,
    ocr_text text,
    has_text boolean NOT NULL DEFAULT false,
    vision_summary text,
    vision_status integer NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_frames_status_captured_at
    ON frames (vision_status, captured_at);

CREATE TABLE IF NOT EXISTS ocr_text (
    frame_id uuid PRIMARY KEY REFERENCES frames(id),
    text text NOT NULL,
    confidence real,
    language text
);
"#;
