//! `OpenAI` Responses API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// `OpenAI` Responses API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    /// Model identifier
    pub model: String,
    /// Input items (messages, function calls, function outputs)
    pub input: Vec<ResponsesItem>,
    /// System instructions (top-level, not an input item)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum output tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Tool definitions (flat shape, unlike Chat Completions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ResponsesTool>>,
    /// Tool choice configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    /// Reasoning configuration (effort, summary visibility)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<serde_json::Value>,
    /// Server-held response to continue from, enabling delta-only input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

/// Input item in a Responses request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsesItem {
    /// Conversation message
    Message {
        /// Message role
        role: String,
        /// Content parts
        content: Vec<ResponsesContentPart>,
    },
    /// A function call the assistant made on an earlier turn
    FunctionCall {
        /// Call identifier
        call_id: String,
        /// Function name
        name: String,
        /// JSON-encoded arguments
        arguments: String,
    },
    /// Result of a function call
    FunctionCallOutput {
        /// Identifier of the originating call
        call_id: String,
        /// Output text
        output: String,
    },
}

/// Content part within a Responses message item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsesContentPart {
    /// Text sent to the model
    InputText {
        /// The text string
        text: String,
    },
    /// Text previously produced by the model
    OutputText {
        /// The text string
        text: String,
    },
    /// Image sent to the model
    InputImage {
        /// Data URI or remote URL
        image_url: String,
    },
}

/// Tool definition in the Responses API (flat, no `function` wrapper)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesTool {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// -- Streaming types --

/// One SSE event from the Responses API
///
/// The API multiplexes many event shapes over a single `type` field; only
/// the fields the decoder consumes are modeled, everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesStreamEvent {
    /// Event type (e.g. "response.output_text.delta")
    #[serde(rename = "type")]
    pub event_type: String,
    /// Incremental payload; a string for text/argument deltas
    #[serde(default)]
    pub delta: Option<serde_json::Value>,
    /// Output item, present on `response.output_item.added` / `.done`
    #[serde(default)]
    pub item: Option<ResponsesOutputItem>,
    /// Output index of the item this event belongs to
    #[serde(default)]
    pub output_index: Option<u32>,
    /// Full arguments string on `response.function_call_arguments.done`
    #[serde(default)]
    pub arguments: Option<String>,
    /// Full text on `response.output_text.done` and
    /// `response.reasoning_summary_text.done`
    #[serde(default)]
    pub text: Option<String>,
    /// Response snapshot on `response.created` / `response.completed`
    #[serde(default)]
    pub response: Option<ResponsesSnapshot>,
}

/// Output item within a stream event
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesOutputItem {
    /// Item type (e.g. "function_call", "message", "reasoning")
    #[serde(rename = "type")]
    pub item_type: String,
    /// Function call identifier
    #[serde(default)]
    pub call_id: Option<String>,
    /// Function name
    #[serde(default)]
    pub name: Option<String>,
    /// Full arguments string, present on `.done` items
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Response snapshot carried by lifecycle events
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesSnapshot {
    /// Server-assigned response id
    pub id: String,
    /// Token usage, present on `response.completed`
    #[serde(default)]
    pub usage: Option<ResponsesUsage>,
}

/// Token usage in a Responses API response
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesUsage {
    /// Input tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Output tokens
    #[serde(default)]
    pub output_tokens: u32,
}
