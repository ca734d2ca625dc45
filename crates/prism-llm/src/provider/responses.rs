//! `OpenAI` Responses provider implementation
//!
//! The stateful protocol: when recent history carries a continuity marker
//! for this model, only the messages after it are sent, referencing the
//! server-held response. A backend that rejects the reference gets one
//! synchronous full-history resend and is remembered as unsupported for
//! the rest of the process.

use async_trait::async_trait;
use prism_config::ModelConfig;
use reqwest::Client;
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;

use super::{ChatProvider, EventStream, apply_headers, decode_sse, send_with_retry};
use crate::continuity::{self, ContinuityPlan};
use crate::convert::responses::{ResponsesDecoder, build_body};
use crate::error::LlmError;
use crate::retry::RetryExecutor;
use crate::types::{ChatRequest, Role};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider speaking the Responses protocol
pub struct ResponsesProvider {
    model_id: String,
    config: ModelConfig,
    client: Client,
    retry: RetryExecutor,
    api_key: String,
    base_url: String,
    url: String,
}

impl ResponsesProvider {
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

        let base_url = config
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
            url: format!("{base_url}/responses"),
            base_url,
        })
    }

    /// The message window a continuity plan selects, with system
    /// instructions always carried along
    ///
    /// Instructions are a per-request field, not server-held state, so
    /// they survive slicing.
    fn windowed_request(&self, request: &ChatRequest, plan: &ContinuityPlan) -> ChatRequest {
        if plan.window_start == 0 {
            return request.clone();
        }

        let mut messages: Vec<_> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .cloned()
            .collect();
        messages.extend(request.messages[plan.window_start..].iter().cloned());

        ChatRequest {
            messages,
            tools: request.tools.clone(),
            tool_choice: request.tool_choice.clone(),
        }
    }

    async fn send(&self, body: &serde_json::Value, cancel: &CancellationToken) -> Result<reqwest::Response, LlmError> {
        send_with_retry(&self.retry, cancel, &self.url, || {
            apply_headers(self.client.post(&self.url), &self.config.headers)
                .bearer_auth(&self.api_key)
                .json(body)
        })
        .await
    }
}

#[async_trait]
impl ChatProvider for ResponsesProvider {
    fn name(&self) -> &'static str {
        "openai-responses"
    }

    async fn stream(&self, request: &ChatRequest, cancel: CancellationToken) -> Result<EventStream, LlmError> {
        // An explicit continuity id in extras means the user has taken
        // manual control; never slice for them
        let user_forced_full = self.config.extra.contains_key("previous_response_id");

        let plan = continuity::plan(&self.base_url, &self.model_id, &request.messages, user_forced_full);
        let windowed = self.windowed_request(request, &plan);
        let body = build_body(
            &self.model_id,
            &self.config,
            &windowed,
            plan.previous_response_id.as_deref(),
        )?;

        let response = match self.send(&body, &cancel).await {
            Ok(response) => response,
            Err(LlmError::Status { status, body: text, url })
                if plan.previous_response_id.is_some() && (400..500).contains(&status) && status != 429 =>
            {
                // The backend rejected the continuity reference; fall back
                // to full history and stop trying delta sends against it
                tracing::warn!(
                    base_url = %self.base_url,
                    status,
                    "previous_response_id rejected, resending full history"
                );
                continuity::mark_unsupported(&self.base_url);

                let full_body = build_body(&self.model_id, &self.config, request, None)?;
                self.send(&full_body, &cancel).await.map_err(|e| {
                    // Keep the fallback's own error; the original is logged
                    tracing::debug!(original_status = status, original_body = %text, original_url = %url, "delta send had failed first");
                    e
                })?
            }
            Err(error) => return Err(error),
        };

        Ok(decode_sse(response, ResponsesDecoder::new(), cancel))
    }
}
