//! Model list discovery
//!
//! Thin listing calls per protocol, consumed by pickers and settings
//! surfaces. Only the id, display name, and context window survive; the
//! rest of each provider's catalog metadata is ignored.

use prism_config::{ModelConfig, ProtocolKind};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::protocol::google::GoogleModelList;
use crate::protocol::ollama::OllamaTagList;
use crate::protocol::openai::OpenAiModelList;
use crate::provider::apply_headers;
use crate::retry::RetryExecutor;

/// Gemini pagination stops after this many pages regardless of tokens
const MAX_GOOGLE_PAGES: usize = 10;

/// One discovered model
#[derive(Debug, Clone)]
pub struct DiscoveredModel {
    /// Provider-side model id
    pub id: String,
    /// Display name if the provider reports one
    pub display_name: Option<String>,
    /// Context window size if the provider reports one
    pub context_length: Option<u32>,
}

/// List the models available behind a model's configured endpoint
pub async fn list_models(
    client: &Client,
    config: &ModelConfig,
    retry: &RetryExecutor,
    cancel: &CancellationToken,
) -> Result<Vec<DiscoveredModel>, LlmError> {
    match config.protocol {
        ProtocolKind::OpenaiChat | ProtocolKind::OpenaiResponses => {
            openai_models(client, config, retry, cancel).await
        }
        ProtocolKind::Anthropic => anthropic_models(client, config, retry, cancel).await,
        ProtocolKind::Google => google_models(client, config, retry, cancel).await,
        ProtocolKind::Ollama => ollama_models(client, config, retry, cancel).await,
    }
}

fn base_url<'a>(config: &'a ModelConfig, default: &'a str) -> &'a str {
    config.base_url.as_ref().map_or(default, |u| u.as_str())
}

async fn fetch(
    client: &Client,
    config: &ModelConfig,
    retry: &RetryExecutor,
    cancel: &CancellationToken,
    url: &str,
    api_key_header: Option<(&str, &str)>,
    bearer: Option<&str>,
) -> Result<reqwest::Response, LlmError> {
    retry
        .execute(cancel, || {
            let mut builder = apply_headers(client.get(url), &config.headers);
            if let Some((name, value)) = api_key_header {
                builder = builder.header(name, value);
            }
            if let Some(token) = bearer {
                builder = builder.bearer_auth(token);
            }
            let url = url.to_owned();

            async move {
                let response = builder.send().await.map_err(|e| LlmError::Transport(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(LlmError::Status {
                        status: status.as_u16(),
                        body,
                        url,
                    });
                }
                Ok(response)
            }
        })
        .await
}

async fn openai_models(
    client: &Client,
    config: &ModelConfig,
    retry: &RetryExecutor,
    cancel: &CancellationToken,
) -> Result<Vec<DiscoveredModel>, LlmError> {
    let base = base_url(config, "https://api.openai.com/v1").trim_end_matches('/');
    let url = format!("{base}/models");
    let api_key = config.api_key.as_ref().map(|k| k.expose_secret().to_owned());

    let response = fetch(client, config, retry, cancel, &url, None, api_key.as_deref()).await?;
    let list: OpenAiModelList = response
        .json()
        .await
        .map_err(|e| LlmError::Decode(format!("failed to parse model list: {e}")))?;

    Ok(list
        .data
        .into_iter()
        .map(|m| DiscoveredModel {
            id: m.id,
            display_name: None,
            context_length: m.context_length,
        })
        .collect())
}

/// Anthropic `/v1/models` entry
#[derive(Debug, Deserialize)]
struct AnthropicModel {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Anthropic `/v1/models` response
#[derive(Debug, Deserialize)]
struct AnthropicModelList {
    #[serde(default)]
    data: Vec<AnthropicModel>,
}

async fn anthropic_models(
    client: &Client,
    config: &ModelConfig,
    retry: &RetryExecutor,
    cancel: &CancellationToken,
) -> Result<Vec<DiscoveredModel>, LlmError> {
    let base = base_url(config, "https://api.anthropic.com").trim_end_matches('/');
    let url = if base.ends_with("/v1") {
        format!("{base}/models")
    } else {
        format!("{base}/v1/models")
    };
    let api_key = config.api_key.as_ref().map(|k| k.expose_secret().to_owned());

    let response = fetch(
        client,
        config,
        retry,
        cancel,
        &url,
        api_key.as_deref().map(|key| ("x-api-key", key)),
        None,
    )
    .await?;
    let list: AnthropicModelList = response
        .json()
        .await
        .map_err(|e| LlmError::Decode(format!("failed to parse model list: {e}")))?;

    Ok(list
        .data
        .into_iter()
        .map(|m| DiscoveredModel {
            id: m.id,
            display_name: m.display_name,
            context_length: None,
        })
        .collect())
}

async fn google_models(
    client: &Client,
    config: &ModelConfig,
    retry: &RetryExecutor,
    cancel: &CancellationToken,
) -> Result<Vec<DiscoveredModel>, LlmError> {
    let base = base_url(config, "https://generativelanguage.googleapis.com").trim_end_matches('/');
    let root = if base.ends_with("/v1beta") || base.ends_with("/v1alpha") || base.ends_with("/v1") {
        format!("{base}/models")
    } else {
        format!("{base}/v1beta/models")
    };
    let api_key = config.api_key.as_ref().map(|k| k.expose_secret().to_owned());

    let mut models = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_GOOGLE_PAGES {
        let url = page_token
            .as_ref()
            .map_or_else(|| root.clone(), |token| format!("{root}?pageToken={token}"));

        let response = fetch(
            client,
            config,
            retry,
            cancel,
            &url,
            api_key.as_deref().map(|key| ("x-goog-api-key", key)),
            None,
        )
        .await?;
        let page: GoogleModelList = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("failed to parse model list: {e}")))?;

        models.extend(page.models.into_iter().map(|m| DiscoveredModel {
            // Resource names look like "models/gemini-2.5-flash"
            id: m.name.strip_prefix("models/").unwrap_or(&m.name).to_owned(),
            display_name: m.display_name,
            context_length: m.input_token_limit,
        }));

        page_token = page.next_page_token;
        if page_token.is_none() {
            break;
        }
    }

    Ok(models)
}

async fn ollama_models(
    client: &Client,
    config: &ModelConfig,
    retry: &RetryExecutor,
    cancel: &CancellationToken,
) -> Result<Vec<DiscoveredModel>, LlmError> {
    let base = base_url(config, "http://localhost:11434").trim_end_matches('/');
    let url = format!("{base}/api/tags");

    let response = fetch(client, config, retry, cancel, &url, None, None).await?;
    let list: OllamaTagList = response
        .json()
        .await
        .map_err(|e| LlmError::Decode(format!("failed to parse tag list: {e}")))?;

    Ok(list
        .models
        .into_iter()
        .map(|m| DiscoveredModel {
            id: m.name,
            display_name: None,
            context_length: None,
        })
        .collect())
}
