//! OCR engine adapter (§4.4, §6)
//!
//! Wraps a local Tesseract installation reached through the `tesseract`
//! crate's language binding. Exposes a version probe used at worker
//! startup (§4.2 `start()`) and the text/confidence extraction contract
//! the OCR worker commits to the database.

use crate::{OcrError, Result};
use async_trait::async_trait;
use std::process::Command;
use tesseract::Tesseract;

/// Extracted text plus an optional overall confidence, on the 0-100 scale
/// Tesseract reports.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrRecognition {
    pub text: Option<String>,
    pub confidence: Option<f32>,
}

/// The OCR engine contract (§4.4): `recognize` turns image bytes into text
/// + confidence, `probe_version` is the one-time capability check run at
/// worker startup.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn probe_version(&self) -> Result<String>;
    async fn recognize(&self, image_bytes: &[u8]) -> Result<OcrRecognition>;
}

/// Tesseract-backed implementation of `OcrEngine`.
pub struct TesseractEngine {
    lang: String,
    config: String,
    min_text_length: usize,
}

impl TesseractEngine {
    pub fn new(lang: String, config: String) -> Self {
        Self {
            lang,
            config,
            min_text_length: 1,
        }
    }

    pub fn with_min_text_length(mut self, min_text_length: usize) -> Self {
        self.min_text_length = min_text_length;
        self
    }

    /// Space-joined sequence of non-empty tokens in reading order (§4.2).
    fn normalize_text(raw: &str) -> Option<String> {
        let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn probe_version(&self) -> Result<String> {
        let output = Command::new("tesseract")
            .arg("--version")
            .output()
            .map_err(|e| OcrError::EngineUnavailable(format!("tesseract binary not found: {e}")))?;

        if !output.status.success() {
            return Err(OcrError::EngineUnavailable(
                "tesseract --version exited with a non-zero status".to_string(),
            ));
        }

        let version_info = String::from_utf8_lossy(&output.stdout);
        Ok(version_info
            .lines()
            .next()
            .unwrap_or("unknown version")
            .to_string())
    }

    async fn recognize(&self, image_bytes: &[u8]) -> Result<OcrRecognition> {
        let lang = self.lang.clone();
        let config = self.config.clone();
        let bytes = image_bytes.to_vec();
        let min_text_length = self.min_text_length;

        tokio::task::spawn_blocking(move || -> Result<OcrRecognition> {
            let mut tess = Tesseract::new(None, Some(&lang))
                .map_err(|e| OcrError::EngineUnavailable(e.to_string()))?;

            if !config.is_empty() {
                tess = tess
                    .set_variable("tessedit_char_whitelist", &config)
                    .map_err(|e| OcrError::RecognitionFailed(e.to_string()))?;
            }

            let mut tess = tess
                .set_image_from_mem(&bytes)
                .map_err(|e| OcrError::RecognitionFailed(e.to_string()))?;

            let raw_text = tess
                .get_text()
                .map_err(|e| OcrError::RecognitionFailed(e.to_string()))?;

            let mean_conf = tess.mean_text_conf();

            let text = TesseractEngine::normalize_text(&raw_text)
                .filter(|t| t.trim().chars().count() >= min_text_length);

            let confidence = if text.is_some() && mean_conf >= 0 {
                Some(mean_conf as f32)
            } else {
                None
            };

            Ok(OcrRecognition { text, confidence })
        })
        .await
        .map_err(|e| OcrError::RecognitionFailed(format!("OCR task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_joins_tokens_with_single_spaces() {
        let normalized = TesseractEngine::normalize_text("Hello\n\n  World   \tAgain").unwrap();
        assert_eq!(normalized, "Hello World Again");
    }

    #[test]
    fn normalize_text_of_blank_input_is_none() {
        assert!(TesseractEngine::normalize_text("   \n\t  ").is_none());
    }
}
