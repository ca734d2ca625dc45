//! Anthropic Messages API provider implementation

use async_trait::async_trait;
use prism_config::ModelConfig;
use reqwest::Client;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use super::{ChatProvider, EventStream, apply_headers, decode_sse, send_with_retry};
use crate::convert::anthropic::{AnthropicDecoder, build_body};
use crate::error::LlmError;
use crate::retry::RetryExecutor;
use crate::types::ChatRequest;

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Provider speaking the Anthropic Messages protocol
pub struct AnthropicProvider {
    model_id: String,
    config: ModelConfig,
    client: Client,
    retry: RetryExecutor,
    api_key: String,
    url: String,
}

impl AnthropicProvider {
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

        // A base that already names the API version only needs the path
        let url = if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        };

        Ok(Self {
            model_id: model_id.to_owned(),
            config: config.clone(),
            client,
            retry,
            api_key,
            url,
        })
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn stream(&self, request: &ChatRequest, cancel: CancellationToken) -> Result<EventStream, LlmError> {
        let body = build_body(&self.model_id, &self.config, request)?;

        let response = send_with_retry(&self.retry, &cancel, &self.url, || {
            apply_headers(self.client.post(&self.url), &self.config.headers)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
        })
        .await?;

        Ok(decode_sse(response, AnthropicDecoder::new(), cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_config::RetryConfig;

    fn config_with_base(base: Option<&str>) -> ModelConfig {
        let mut config: ModelConfig =
            serde_json::from_value(serde_json::json!({"protocol": "anthropic", "api_key": "sk-test"})).unwrap();
        config.base_url = base.map(|b| url::Url::parse(b).unwrap());
        config
    }

    fn provider(base: Option<&str>) -> AnthropicProvider {
        AnthropicProvider::new(
            "claude-sonnet-4",
            &config_with_base(base),
            Client::new(),
            RetryExecutor::new(&RetryConfig::default()),
        )
        .unwrap()
    }

    #[test]
    fn version_segment_is_not_duplicated() {
        assert_eq!(provider(None).url, "https://api.anthropic.com/v1/messages");
        assert_eq!(
            provider(Some("https://proxy.example/v1")).url,
            "https://proxy.example/v1/messages"
        );
        assert_eq!(
            provider(Some("https://proxy.example")).url,
            "https://proxy.example/v1/messages"
        );
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let mut config = config_with_base(None);
        config.api_key = None;
        let result = AnthropicProvider::new(
            "claude-sonnet-4",
            &config,
            Client::new(),
            RetryExecutor::new(&RetryConfig::default()),
        );
        assert!(matches!(result, Err(LlmError::Config(_))));
    }
}
