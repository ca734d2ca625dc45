//! `OpenAI` Chat Completions provider implementation

use async_trait::async_trait;
use prism_config::ModelConfig;
use reqwest::Client;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use super::{ChatProvider, EventStream, apply_headers, decode_sse, send_with_retry};
use crate::convert::openai::{OpenAiChatDecoder, build_body};
use crate::error::LlmError;
use crate::retry::RetryExecutor;
use crate::types::ChatRequest;

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider speaking the Chat Completions protocol
pub struct OpenAiChatProvider {
    model_id: String,
    config: ModelConfig,
    client: Client,
    retry: RetryExecutor,
    api_key: String,
    url: String,
}

impl OpenAiChatProvider {
    /// Create from model configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the API key is missing.
    pub fn new(model_id: &str, config: &ModelConfig, client: Client, retry: RetryExecutor) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().to_owned())
            .ok_or_else(|| LlmError::Config(format!("model {model_id} has no API key configured")))?;

        let base = config
            .base_url
            .as_ref()
            .map_or(DEFAULT_BASE_URL, |u| u.as_str())
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            model_id: model_id.to_owned(),
            config: config.clone(),
            client,
            retry,
            api_key,
            url: format!("{base}/chat/completions"),
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatProvider {
    fn name(&self) -> &'static str {
        "openai-chat"
    }

    async fn stream(&self, request: &ChatRequest, cancel: CancellationToken) -> Result<EventStream, LlmError> {
        let body = build_body(&self.model_id, &self.config, request)?;

        let response = send_with_retry(&self.retry, &cancel, &self.url, || {
            apply_headers(self.client.post(&self.url), &self.config.headers)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        Ok(decode_sse(response, OpenAiChatDecoder::new(), cancel))
    }
}
