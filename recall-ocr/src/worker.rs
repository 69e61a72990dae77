//! OCR worker loop (§4.2, §6 `ocr-worker`)
//!
//! Claims a batch of `PENDING` frames, runs each through the configured
//! `OcrEngine`, and commits the outcome one frame at a time so a single
//! bad frame cannot block the rest of the batch.

use crate::engine::OcrEngine;
use crate::image_loader;
use crate::{OcrError, Result};
use recall_db::{DatabaseManager, FrameStatus, OcrOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tunables for an `OcrWorker`, sourced from CLI flags / config file (§4.5,
/// §6) by the `ocr-worker` binary.
#[derive(Debug, Clone)]
pub struct OcrWorkerConfig {
    pub batch_size: u32,
    pub poll_interval: Duration,
    pub lang: String,
    pub min_text_length: usize,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for OcrWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(5),
            lang: "eng".to_string(),
            min_text_length: 1,
            retry_delay: Duration::from_secs(1),
            max_retries: 5,
        }
    }
}

/// Drives frames from `PENDING` to `OCR_DONE` or `ERROR`.
pub struct OcrWorker {
    db: Arc<DatabaseManager>,
    engine: Arc<dyn OcrEngine>,
    config: OcrWorkerConfig,
    running: Arc<AtomicBool>,
}

impl OcrWorker {
    pub fn new(db: Arc<DatabaseManager>, engine: Arc<dyn OcrEngine>, config: OcrWorkerConfig) -> Self {
        Self {
            db,
            engine,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clone of the worker's running flag, for external shutdown signal
    /// handlers (the `ocr-worker` binary wires `ctrl_c`/`SIGTERM` to this).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Capability check (§4.2 step 1) followed by the poll loop. Returns an
    /// error immediately if Tesseract is not reachable; this is meant to
    /// cause the binary to exit non-zero at startup (§7 category 4) rather
    /// than spin forever failing every cycle.
    pub async fn start(&self) -> Result<()> {
        let version = self.engine.probe_version().await?;
        tracing::info!(version = %version, "OCR engine ready");

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
                    tracing::error!(error = %e, attempt = consecutive_failures, "OCR cycle failed");

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

    /// Cooperative shutdown: the next iteration of `start`'s loop observes
    /// this and exits after the current cycle finishes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// One claim-process-commit cycle. Returns the number of frames
    /// claimed (0 means the queue was empty, the caller should sleep).
    pub async fn run_cycle(&self) -> Result<usize> {
        let claimed = self
            .db
            .claim_frames(FrameStatus::Pending, FrameStatus::OcrProcessing, self.config.batch_size)
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("claim failed: {e}")))?;

        let count = claimed.len();

        for frame in claimed {
            let outcome = self.process_frame(&frame.image_ref).await;
            if let Err(e) = self.db.complete_ocr(frame.id, outcome).await {
                tracing::error!(frame_id = %frame.id, error = %e, "failed to commit OCR outcome");
            }
        }

        Ok(count)
    }

    /// Resolve `image_ref`, run it through the OCR engine, and produce the
    /// outcome the caller commits. Never returns an `Err` itself: every
    /// failure path becomes an `OcrOutcome::Error` (§4.2 step 4, §7
    /// category 2).
    async fn process_frame(&self, image_ref: &str) -> OcrOutcome {
        recognize_frame(self.engine.as_ref(), &self.config.lang, image_ref).await
    }
}

/// The single-frame recognition path, factored out of `OcrWorker` so it can
/// be exercised without a database handle.
async fn recognize_frame(engine: &dyn OcrEngine, lang: &str, image_ref: &str) -> OcrOutcome {
    let bytes = match image_loader::load_image_bytes(image_ref) {
        Ok(bytes) => bytes,
        Err(e) => return OcrOutcome::Error { message: e.to_string() },
    };

    match engine.recognize(&bytes).await {
        Ok(recognition) => OcrOutcome::Success {
            text: recognition.text,
            confidence: recognition.confidence,
            language: lang.to_string(),
        },
        Err(e) => OcrOutcome::Error { message: e.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::OcrRecognition;
    use async_trait::async_trait;
    use image::{ImageBuffer, Rgba};

    struct StubEngine {
        recognition: Result<OcrRecognition>,
    }

    #[async_trait]
    impl OcrEngine for StubEngine {
        async fn probe_version(&self) -> Result<String> {
            Ok("stub-1.0".to_string())
        }

        async fn recognize(&self, _image_bytes: &[u8]) -> Result<OcrRecognition> {
            match &self.recognition {
                Ok(r) => Ok(r.clone()),
                Err(_) => Err(OcrError::RecognitionFailed("stub failure".to_string())),
            }
        }
    }

    fn write_test_png(dir: &std::path::Path, name: &str) -> String {
        let path = dir.join(name);
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(2, 2);
        img.save(&path).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn process_frame_missing_file_is_an_error_outcome() {
        let engine = StubEngine {
            recognition: Ok(OcrRecognition {
                text: Some("unused".to_string()),
                confidence: Some(90.0),
            }),
        };

        let outcome = recognize_frame(&engine, "eng", "/definitely/missing.png").await;
        match outcome {
            OcrOutcome::Error { message } => assert!(message.contains("could not load image")),
            OcrOutcome::Success { .. } => panic!("expected an error outcome"),
        }
    }

    #[tokio::test]
    async fn process_frame_recognized_text_is_a_success_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_png(dir.path(), "frame.png");

        let engine = StubEngine {
            recognition: Ok(OcrRecognition {
                text: Some("hello world".to_string()),
                confidence: Some(87.5),
            }),
        };

        let outcome = recognize_frame(&engine, "eng", &path).await;
        match outcome {
            OcrOutcome::Success { text, confidence, language } => {
                assert_eq!(text.as_deref(), Some("hello world"));
                assert_eq!(confidence, Some(87.5));
                assert_eq!(language, "eng");
            }
            OcrOutcome::Error { message } => panic!("expected success, got error: {message}"),
        }
    }

    #[tokio::test]
    async fn process_frame_engine_failure_is_an_error_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_png(dir.path(), "frame.png");

        let engine = StubEngine {
            recognition: Err(OcrError::RecognitionFailed("boom".to_string())),
        };

        let outcome = recognize_frame(&engine, "eng", &path).await;
        assert!(matches!(outcome, OcrOutcome::Error { .. }));
    }

    #[tokio::test]
    async fn process_frame_with_no_text_found_has_none_text_and_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_png(dir.path(), "blank.png");

        let engine = StubEngine {
            recognition: Ok(OcrRecognition {
                text: None,
                confidence: None,
            }),
        };

        let outcome = recognize_frame(&engine, "eng", &path).await;
        match outcome {
            OcrOutcome::Success { text, confidence, .. } => {
                assert!(text.is_none());
                assert!(confidence.is_none());
            }
            OcrOutcome::Error { message } => panic!("expected success, got error: {message}"),
        }
    }
}
