//! Database query implementations
//!
//! Implements the claim protocol (§4.1) and the per-frame update operations
//! both workers use to commit their outcomes. All mutations are
//! parameterized to prevent SQL injection.

use crate::models::*;
use crate::{DatabaseError, DatabaseManager, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

impl DatabaseManager {
    /// Insert a new frame row. Frame capture is out of scope for this
    /// pipeline; this exists for operator tooling and test fixtures.
    pub async fn insert_frame(&self, frame: NewFrame) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO frames (captured_at, image_ref, window_title, app_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(frame.captured_at)
        .bind(frame.image_ref)
        .bind(frame.window_title)
        .bind(frame.app_name)
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }

    /// Fetch a single frame by id.
    pub async fn get_frame(&self, id: Uuid) -> Result<Option<FrameRecord>> {
        let frame = sqlx::query_as::<_, FrameRecord>(
            r#"
            SELECT id, captured_at, image_ref, window_title, app_name,
                   ocr_text, has_text, vision_summary, vision_status
            FROM frames
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(frame)
    }

    /// The claim protocol (§4.1): within a single transaction, select up to
    /// `batch_size` rows with `vision_status = status_in`, oldest-first,
    /// skipping rows already locked by another transaction, and advance
    /// them to `status_claim`. Returns the claimed rows in claim order.
    ///
    /// `status_in` must be a claimable input state and `status_claim` must
    /// be its corresponding `claim_target`; callers that violate this are a
    /// programming error, not a recoverable one, so it is asserted here
    /// rather than threaded through as a `Result`.
    pub async fn claim_frames(
        &self,
        status_in: FrameStatus,
        status_claim: FrameStatus,
        batch_size: u32,
    ) -> Result<Vec<FrameRecord>> {
        assert_eq!(
            status_in.claim_target(),
            Some(status_claim),
            "claim_frames called with a status pair outside the allowed transitions"
        );

        let mut tx = self.pool().begin().await?;

        let claimed = sqlx::query_as::<_, FrameRecord>(
            r#"
            SELECT id, captured_at, image_ref, window_title, app_name,
                   ocr_text, has_text, vision_summary, vision_status
            FROM frames
            WHERE vision_status = $1
            ORDER BY captured_at ASC, id ASC
            FOR UPDATE SKIP LOCKED
            LIMIT $2
            "#,
        )
        .bind(i32::from(status_in))
        .bind(batch_size as i64)
        .fetch_all(&mut *tx)
        .await?;

        if !claimed.is_empty() {
            let ids: Vec<Uuid> = claimed.iter().map(|f| f.id).collect();
            sqlx::query("UPDATE frames SET vision_status = $1 WHERE id = ANY($2)")
                .bind(i32::from(status_claim))
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(claimed
            .into_iter()
            .map(|mut frame| {
                frame.vision_status = status_claim.into();
                frame
            })
            .collect())
    }

    /// Apply one frame's OCR outcome (§4.2 step 4): either mark `OCR_DONE`
    /// with the extracted text, or mark `ERROR`. Runs in its own
    /// transaction so a failure on one frame cannot corrupt another's
    /// commit within the same cycle.
    pub async fn complete_ocr(&self, frame_id: Uuid, outcome: OcrOutcome) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        match outcome {
            OcrOutcome::Success {
                text,
                confidence,
                language,
            } => {
                let has_text = text.is_some();

                sqlx::query(
                    r#"
                    UPDATE frames
                    SET ocr_text = $1, has_text = $2, vision_status = $3
                    WHERE id = $4
                    "#,
                )
                .bind(&text)
                .bind(has_text)
                .bind(i32::from(FrameStatus::OcrDone))
                .bind(frame_id)
                .execute(&mut *tx)
                .await?;

                if let Some(text) = text {
                    sqlx::query(
                        r#"
                        INSERT INTO ocr_text (frame_id, text, confidence, language)
                        VALUES ($1, $2, $3, $4)
                        ON CONFLICT (frame_id) DO NOTHING
                        "#,
                    )
                    .bind(frame_id)
                    .bind(text)
                    .bind(confidence)
                    .bind(language)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            OcrOutcome::Error { message } => {
                tracing::warn!(frame_id = %frame_id, error = %message, "OCR failed for frame");
                sqlx::query("UPDATE frames SET vision_status = $1 WHERE id = $2")
                    .bind(i32::from(FrameStatus::Error))
                    .bind(frame_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Apply one frame's vision outcome (§4.3): either mark `VISION_DONE`
    /// with the summary, or mark `ERROR`.
    pub async fn complete_vision(&self, frame_id: Uuid, outcome: VisionOutcome) -> Result<()> {
        match outcome {
            VisionOutcome::Success { summary } => {
                sqlx::query(
                    r#"
                    UPDATE frames
                    SET vision_summary = $1, vision_status = $2
                    WHERE id = $3
                    "#,
                )
                .bind(summary)
                .bind(i32::from(FrameStatus::VisionDone))
                .bind(frame_id)
                .execute(self.pool())
                .await?;
            }
            VisionOutcome::Error { message } => {
                tracing::warn!(frame_id = %frame_id, error = %message, "vision summarization failed for frame");
                sqlx::query("UPDATE frames SET vision_status = $1 WHERE id = $2")
                    .bind(i32::from(FrameStatus::Error))
                    .bind(frame_id)
                    .execute(self.pool())
                    .await?;
            }
        }

        Ok(())
    }

    /// Operator recovery (§7 category 5): reset rows stuck in
    /// `processing_status` for longer than `stale_after_secs` back to the
    /// preceding terminal-input state. Safe to call repeatedly; it only
    /// ever moves rows backward to a state a worker is allowed to claim
    /// from again, never forward.
    pub async fn reap_stranded(
        &self,
        processing_status: FrameStatus,
        stale_after_secs: i64,
    ) -> Result<u64> {
        let target = processing_status.reap_target().ok_or_else(|| {
            DatabaseError::InvalidParameter(format!(
                "{:?} is not a *_PROCESSING state and has no reap target",
                processing_status
            ))
        })?;

        // `updated` tracking requires a timestamp column; since the schema
        // only carries `captured_at`, staleness is judged against it for
        // rows that have been sitting in a processing state since before
        // the cutoff. Operators running this expect it to run well after
        // the crash, so this is a coarse but safe approximation.
        let cutoff: DateTime<Utc> = Utc::now() - chrono::Duration::seconds(stale_after_secs);

        let result = sqlx::query(
            r#"
            UPDATE frames
            SET vision_status = $1
            WHERE vision_status = $2 AND captured_at < $3
            "#,
        )
        .bind(i32::from(target))
        .bind(i32::from(processing_status))
        .bind(cutoff)
        .execute(self.pool())
        .await?;

        if result.rows_affected() > 0 {
            tracing::warn!(
                count = result.rows_affected(),
                from = ?processing_status,
                to = ?target,
                "recovered stranded frames"
            );
        }

        Ok(result.rows_affected())
    }
}

