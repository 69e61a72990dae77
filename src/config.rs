//! Configuration layer (§4.5)
//!
//! Settings resolve lowest to highest precedence: built-in defaults,
//! optional `config.toml` (a table per worker), then CLI flags. Secrets
//! (`DATABASE_URL`, the vision provider's API key) are read only from the
//! environment, never from the config file or CLI, so they never show up
//! in process listings or committed config.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Parsed `config.toml`. Either table is absent if the file doesn't define
/// it, which callers treat the same as "no override".
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    pub ocr_worker: Option<OcrWorkerFileConfig>,
    pub vision_worker: Option<VisionWorkerFileConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OcrWorkerFileConfig {
    pub batch_size: Option<u32>,
    pub poll_interval: Option<f64>,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VisionWorkerFileConfig {
    pub batch_size: Option<u32>,
    pub poll_interval: Option<f64>,
    pub model: Option<String>,
    pub model_endpoint: Option<String>,
    pub max_tokens: Option<u32>,
    pub rate_limit_delay: Option<f64>,
}

/// Loads `path` if given and present; an absent path or missing file is not
/// an error, it just means every setting falls through to CLI/defaults.
pub fn load_config_file(path: Option<&Path>) -> anyhow::Result<ConfigFile> {
    let Some(path) = path else {
        return Ok(ConfigFile::default());
    };

    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// `DATABASE_URL` is mandatory; its absence is a fatal startup error (§7
/// category 4).
pub fn database_url() -> anyhow::Result<String> {
    std::env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")
}

/// The vision provider's API key. Optional: some self-hosted gateways
/// don't require authentication.
pub fn vision_api_key() -> Option<String> {
    std::env::var("VISION_API_KEY").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_path_yields_empty_config() {
        let config = load_config_file(None).unwrap();
        assert!(config.ocr_worker.is_none());
        assert!(config.vision_worker.is_none());
    }

    #[test]
    fn nonexistent_file_yields_empty_config() {
        let config = load_config_file(Some(Path::new("/definitely/missing/config.toml"))).unwrap();
        assert!(config.ocr_worker.is_none());
    }

    #[test]
    fn parses_worker_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [ocr_worker]
            batch_size = 20
            lang = "eng+spa"

            [vision_worker]
            model = "claude-3-5-sonnet-latest"
            max_tokens = 300
            "#,
        )
        .unwrap();

        let config = load_config_file(Some(&path)).unwrap();
        let ocr = config.ocr_worker.unwrap();
        assert_eq!(ocr.batch_size, Some(20));
        assert_eq!(ocr.lang.as_deref(), Some("eng+spa"));

        let vision = config.vision_worker.unwrap();
        assert_eq!(vision.model.as_deref(), Some("claude-3-5-sonnet-latest"));
        assert_eq!(vision.max_tokens, Some(300));
    }
}
