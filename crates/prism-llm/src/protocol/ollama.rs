//! Ollama chat API wire format types
//!
//! Ollama streams one JSON object per line over `/api/chat`, with no SSE
//! envelope and no authentication.

use serde::{Deserialize, Serialize};

// -- Request types --

/// Ollama chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaChatRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    pub messages: Vec<OllamaMessage>,
    /// Whether to stream (Ollama defaults to true; sent explicitly)
    pub stream: bool,
    /// Tool definitions (OpenAI-shaped)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<super::openai::OpenAiTool>>,
    /// Runtime options (temperature, `num_predict`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Ollama message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaMessage {
    /// Message role ("system", "user", "assistant", "tool")
    pub role: String,
    /// Message text
    #[serde(default)]
    pub content: String,
    /// Base64-encoded images attached to the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OllamaToolCall>>,
    /// Model reasoning, populated when the model supports thinking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

/// Tool call within an Ollama message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaToolCall {
    /// Function call details
    pub function: OllamaFunctionCall,
}

/// Function call details; arguments arrive as a JSON object, not a string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    /// Function name
    pub name: String,
    /// Arguments object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

// -- Streaming types --

/// One JSON line of a streaming Ollama chat response
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatChunk {
    /// Partial message for this chunk
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped (final chunk only)
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Prompt token count (final chunk only)
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    /// Completion token count (final chunk only)
    #[serde(default)]
    pub eval_count: Option<u32>,
}

// -- Models list types --

/// Ollama `/api/tags` response
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTagList {
    /// Installed models
    #[serde(default)]
    pub models: Vec<OllamaTag>,
}

/// Installed model entry
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTag {
    /// Model name with tag (e.g. "llama3.2:latest")
    pub name: String,
}
