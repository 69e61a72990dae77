//! HTTP vision model adapter (§4.4)
//!
//! Shaped like OpenAI's chat-completions endpoint, which most self-hosted
//! and compatible gateways also implement. Sends one message carrying the
//! rendered prompt text and the frame's image as a data URI, and returns
//! the first choice's content as the summary.

use crate::{VisionError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// The vision model contract (§4.4): `summarize` turns a prompt and an
/// image data URI into a single summary string.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn summarize(&self, prompt_text: &str, image_data_uri: &str, max_tokens: u32) -> Result<String>;
}

/// Chat-completions client. Constructed once per worker lifetime; its
/// `reqwest::Client` keeps its own connection pool.
pub struct HttpVisionModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpVisionModel {
    /// `endpoint` is the provider's base URL (e.g. `https://api.openai.com`
    /// or a self-hosted gateway's URL); `/v1/chat/completions` is appended
    /// unless the caller already supplied a path ending in it.
    pub fn new(endpoint: String, model: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            model,
            api_key,
        }
    }

    fn chat_completions_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }
}

#[async_trait]
impl VisionModel for HttpVisionModel {
    async fn summarize(&self, prompt_text: &str, image_data_uri: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt_text },
                        { "type": "image_url", "image_url": { "url": image_data_uri } }
                    ]
                }
            ],
            "stream": false
        });

        let mut request = self.client.post(self.chat_completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| VisionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| VisionError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(VisionError::RequestFailed(format!(
                "HTTP {status}: {text}"
            )));
        }

        let parsed: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| VisionError::InvalidResponse(format!("not valid JSON: {e}")))?;

        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| VisionError::InvalidResponse(format!("no first choice in response: {text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_v1_chat_completions_to_bare_base_url() {
        let model = HttpVisionModel::new("https://api.openai.com".to_string(), "gpt-4o".to_string(), None);
        assert_eq!(model.chat_completions_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn does_not_double_append_when_path_already_present() {
        let model = HttpVisionModel::new(
            "https://gateway.example/v1/chat/completions".to_string(),
            "gpt-4o".to_string(),
            None,
        );
        assert_eq!(
            model.chat_completions_url(),
            "https://gateway.example/v1/chat/completions"
        );
    }

    #[test]
    fn strips_trailing_slash_before_appending() {
        let model = HttpVisionModel::new("https://api.openai.com/".to_string(), "gpt-4o".to_string(), None);
        assert_eq!(model.chat_completions_url(), "https://api.openai.com/v1/chat/completions");
    }
}
