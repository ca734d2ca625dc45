//! Google Generative Language API provider implementation

use async_trait::async_trait;
use prism_config::ModelConfig;
use reqwest::Client;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use super::{ChatProvider, EventStream, apply_headers, decode_sse, send_with_retry};
use crate::convert::google::{GoogleDecoder, build_body};
use crate::error::LlmError;
use crate::retry::RetryExecutor;
use crate::types::ChatRequest;

/// Default Google Generative Language API base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Provider speaking the Gemini `generateContent` protocol
pub struct GoogleProvider {
    config: ModelConfig,
    client: Client,
    retry: RetryExecutor,
    api_key: String,
    url: String,
}

impl GoogleProvider {
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
            config: config.clone(),
            client,
            retry,
            api_key,
            url: stream_url(&base, model_id),
        })
    }
}

/// Build the streaming endpoint URL
///
/// Accepts a bare domain, a base already ending in an API version, or a
/// full endpoint-shaped URL pasted straight from provider docs.
fn stream_url(base: &str, model: &str) -> String {
    if base.contains(":streamGenerateContent") {
        if base.contains("alt=sse") {
            return base.to_owned();
        }
        let separator = if base.contains('?') { '&' } else { '?' };
        return format!("{base}{separator}alt=sse");
    }

    if base.ends_with("/v1beta") || base.ends_with("/v1alpha") || base.ends_with("/v1") {
        return format!("{base}/models/{model}:streamGenerateContent?alt=sse");
    }

    format!("{base}/v1beta/models/{model}:streamGenerateContent?alt=sse")
}

#[async_trait]
impl ChatProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn stream(&self, request: &ChatRequest, cancel: CancellationToken) -> Result<EventStream, LlmError> {
        let body = build_body(&self.config, request)?;

        let response = send_with_retry(&self.retry, &cancel, &self.url, || {
            apply_headers(self.client.post(&self.url), &self.config.headers)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;

        Ok(decode_sse(response, GoogleDecoder::new(), cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domain_gets_the_full_path() {
        assert_eq!(
            stream_url("https://generativelanguage.googleapis.com", "gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn versioned_base_is_not_doubled() {
        assert_eq!(
            stream_url("https://proxy.example/v1beta", "gemini-2.5-pro"),
            "https://proxy.example/v1beta/models/gemini-2.5-pro:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn full_endpoint_base_only_gains_sse() {
        assert_eq!(
            stream_url(
                "https://proxy.example/v1beta/models/custom:streamGenerateContent",
                "ignored"
            ),
            "https://proxy.example/v1beta/models/custom:streamGenerateContent?alt=sse"
        );
    }
}
