use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Wire protocol a model speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// OpenAI Chat Completions (`/chat/completions`)
    OpenaiChat,
    /// OpenAI Responses (`/responses`)
    OpenaiResponses,
    /// Anthropic Messages API
    Anthropic,
    /// Google Generative Language API
    Google,
    /// Ollama chat API (JSON lines)
    Ollama,
}

/// Which wire field carries the output token limit
///
/// OpenAI-compatible backends disagree on the field name, and some reject
/// requests that set more than one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxTokensVariant {
    /// Classic `max_tokens`
    #[default]
    MaxTokens,
    /// Newer `max_completion_tokens`
    MaxCompletionTokens,
}

/// Sampling parameters forwarded to the provider
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingConfig {
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Top-k sampling
    #[serde(default)]
    pub top_k: Option<u32>,
    /// Minimum probability sampling (Ollama)
    #[serde(default)]
    pub min_p: Option<f64>,
    /// Frequency penalty
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty
    #[serde(default)]
    pub presence_penalty: Option<f64>,
    /// Repetition penalty (Ollama `repeat_penalty`)
    #[serde(default)]
    pub repetition_penalty: Option<f64>,
}

/// Reasoning ("thinking") behavior for a model
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReasoningConfig {
    /// Send previously produced thinking parts back on follow-up turns
    ///
    /// Some providers reject reasoning blocks they did not just produce,
    /// so this defaults to off.
    #[serde(default)]
    pub include_in_request: bool,
    /// Reasoning effort hint forwarded verbatim ("low", "medium", "high")
    #[serde(default)]
    pub effort: Option<String>,
}

/// Configuration for a single model
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Wire protocol this model speaks
    pub protocol: ProtocolKind,
    /// Display name shown to the user
    #[serde(default)]
    pub display_name: Option<String>,
    /// Base URL of the provider endpoint
    #[serde(default)]
    pub base_url: Option<Url>,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Sampling parameters
    #[serde(default)]
    pub params: SamplingConfig,
    /// Output token limit
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Which wire field carries `max_tokens` on OpenAI-compatible backends
    #[serde(default)]
    pub max_tokens_variant: MaxTokensVariant,
    /// Stop sequences
    #[serde(default)]
    pub stop: Option<Vec<String>>,
    /// Extra headers applied to every request for this model
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Minimum delay between consecutive requests to this provider path,
    /// in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
    /// Reasoning behavior
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    /// Provider-specific parameters merged verbatim into the request body,
    /// last, so they may overwrite computed fields
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
