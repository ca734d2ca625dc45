//! Ollama provider implementation
//!
//! Ollama speaks JSON lines over `/api/chat` and needs no authentication.

use async_trait::async_trait;
use prism_config::ModelConfig;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::{ChatProvider, EventStream, apply_headers, decode_json_lines, send_with_retry};
use crate::convert::ollama::{OllamaDecoder, build_body};
use crate::error::LlmError;
use crate::retry::RetryExecutor;
use crate::types::ChatRequest;

/// Default local Ollama base URL
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Provider speaking the Ollama chat protocol
pub struct OllamaProvider {
    model_id: String,
    config: ModelConfig,
    client: Client,
    retry: RetryExecutor,
    url: String,
}

impl OllamaProvider {
    /// Create from model configuration
    pub fn new(model_id: &str, config: &ModelConfig, client: Client, retry: RetryExecutor) -> Self {
        let base = config
            .base_url
            .as_ref()
            .map_or(DEFAULT_BASE_URL, |u| u.as_str())
            .trim_end_matches('/')
            .to_owned();

        Self {
            model_id: model_id.to_owned(),
            config: config.clone(),
            client,
            retry,
            url: format!("{base}/api/chat"),
        }
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn stream(&self, request: &ChatRequest, cancel: CancellationToken) -> Result<EventStream, LlmError> {
        let body = build_body(&self.model_id, &self.config, request)?;

        let response = send_with_retry(&self.retry, &cancel, &self.url, || {
            apply_headers(self.client.post(&self.url), &self.config.headers).json(&body)
        })
        .await?;

        Ok(decode_json_lines(response, OllamaDecoder::new(), cancel))
    }
}
