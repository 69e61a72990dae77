//! Vision worker loop (§4.3, §6 `vision-worker`)
//!
//! Claims a batch of `OCR_DONE` frames, sends each through the configured
//! `VisionModel`, and commits the outcome one frame at a time. A
//! `rate_limit_delay` separates consecutive model calls within a batch so a
//! large batch does not hammer the provider.

use crate::client::VisionModel;
use crate::prompt;
use crate::{image_encoding, VisionError, Result};
use recall_db::{DatabaseManager, FrameStatus, VisionOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tunables for a `VisionWorker`, sourced from CLI flags / config file
/// (§4.5, §6) by the `vision-worker` binary.
#[derive(Debug, Clone)]
pub struct VisionWorkerConfig {
    pub batch_size: u32,
    pub poll_interval: Duration,
    pub max_tokens: u32,
    pub rate_limit_delay: Duration,
    pub prompt_template: String,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for VisionWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(5),
            max_tokens: 150,
            rate_limit_delay: Duration::from_millis(500),
            prompt_template: prompt::default_template().to_string(),
            retry_delay: Duration::from_secs(1),
            max_retries: 5,
        }
    }
}

/// Drives frames from `OCR_DONE` to `VISION_DONE` or `ERROR`.
pub struct VisionWorker {
    db: Arc<DatabaseManager>,
    model: Arc<dyn VisionModel>,
    config: VisionWorkerConfig,
    running: Arc<AtomicBool>,
}

impl VisionWorker {
    pub fn new(db: Arc<DatabaseManager>, model: Arc<dyn VisionModel>, config: VisionWorkerConfig) -> Self {
        Self {
            db,
            model,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clone of the worker's running flag, for external shutdown signal
    /// handlers (the `vision-worker` binary wires `ctrl_c`/`SIGTERM` to
    /// this).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        let mut consecutive_failures = 0u32;

        while self.running.load(Ordering::SeqCst) {
            match self.run_cycle().await {
                Ok(0) => {
                    consecutive_failures = 0;
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Ok(_) => {
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    tracing::error!(error = %e, attempt = consecutive_failures, "vision cycle failed");

                    if consecutive_failures > self.config.max_retries {
                        return Err(e);
                    }

                    let backoff = self.config.retry_delay * 2u32.pow(consecutive_failures.min(6) - 1);
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// One claim-process-commit cycle. Returns the number of frames
    /// claimed (0 means the queue was empty, the caller should sleep).
    pub async fn run_cycle(&self) -> Result<usize> {
        let claimed = self
            .db
            .claim_frames(FrameStatus::OcrDone, FrameStatus::VisionProcessing, self.config.batch_size)
            .await
            .map_err(|e| VisionError::RequestFailed(format!("claim failed: {e}")))?;

        let count = claimed.len();

        for (index, frame) in claimed.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.rate_limit_delay).await;
            }

            let outcome = self
                .summarize_frame(&frame.image_ref, frame.ocr_text.as_deref())
                .await;

            if let Err(e) = self.db.complete_vision(frame.id, outcome).await {
                tracing::error!(frame_id = %frame.id, error = %e, "failed to commit vision outcome");
            }
        }

        Ok(count)
    }

    async fn summarize_frame(&self, image_ref: &str, ocr_text: Option<&str>) -> VisionOutcome {
        summarize(
            self.model.as_ref(),
            &self.config.prompt_template,
            image_ref,
            ocr_text,
            self.config.max_tokens,
        )
        .await
    }
}

/// The single-frame summarization path, factored out of `VisionWorker` so
/// it can be exercised without a database handle.
async fn summarize(
    model: &dyn VisionModel,
    prompt_template: &str,
    image_ref: &str,
    ocr_text: Option<&str>,
    max_tokens: u32,
) -> VisionOutcome {
    let data_uri = match image_encoding::to_data_uri(image_ref) {
        Ok(uri) => uri,
        Err(e) => return VisionOutcome::Error { message: e.to_string() },
    };

    let prompt_text = prompt::build_prompt(prompt_template, ocr_text);

    match model.summarize(&prompt_text, &data_uri, max_tokens).await {
        Ok(summary) if !summary.trim().is_empty() => VisionOutcome::Success { summary },
        Ok(_) => VisionOutcome::Error {
            message: "vision model returned an empty summary".to_string(),
        },
        Err(e) => VisionOutcome::Error { message: e.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubModel {
        response: Result<String>,
    }

    #[async_trait]
    impl VisionModel for StubModel {
        async fn summarize(&self, _prompt_text: &str, _image_data_uri: &str, _max_tokens: u32) -> Result<String> {
            match &self.response {
                Ok(s) => Ok(s.clone()),
                Err(_) => Err(VisionError::RequestFailed("stub failure".to_string())),
            }
        }
    }

    fn write_test_file(dir: &std::path::Path, name: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn missing_image_is_an_error_outcome() {
        let model = StubModel {
            response: Ok("Vision Summary".to_string()),
        };

        let outcome = summarize(&model, prompt::default_template(), "/missing.jpg", Some("text"), 150).await;
        assert!(matches!(outcome, VisionOutcome::Error { .. }));
    }

    #[tokio::test]
    async fn successful_summary_is_a_success_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_file(dir.path(), "frame.jpg");

        let model = StubModel {
            response: Ok("Vision Summary".to_string()),
        };

        let outcome = summarize(&model, prompt::default_template(), &path, Some("ocr text content"), 150).await;
        match outcome {
            VisionOutcome::Success { summary } => assert_eq!(summary, "Vision Summary"),
            VisionOutcome::Error { message } => panic!("expected success, got error: {message}"),
        }
    }

    #[tokio::test]
    async fn model_error_is_an_error_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_file(dir.path(), "frame.jpg");

        let model = StubModel {
            response: Err(VisionError::RequestFailed("boom".to_string())),
        };

        let outcome = summarize(&model, prompt::default_template(), &path, None, 150).await;
        assert!(matches!(outcome, VisionOutcome::Error { .. }));
    }

    #[tokio::test]
    async fn empty_summary_is_treated_as_an_error_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_file(dir.path(), "frame.jpg");

        let model = StubModel {
            response: Ok("   ".to_string()),
        };

        let outcome = summarize(&model, prompt::default_template(), &path, None, 150).await;
        assert!(matches!(outcome, VisionOutcome::Error { .. }));
    }
}
