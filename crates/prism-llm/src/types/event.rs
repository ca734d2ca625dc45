use serde::{Deserialize, Serialize};

/// Canonical event emitted while decoding a streaming response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatEvent {
    /// Incremental answer text
    TextDelta(String),
    /// Incremental reasoning text
    ThinkingDelta(String),
    /// The reasoning channel closed; answer text or tool calls follow
    ThinkingEnd {
        /// Continuation signature to echo back if the reasoning is resent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// A complete tool call
    ToolCall(ToolCallEvent),
    /// Token usage as reported by the provider
    Usage(Usage),
    /// Terminal completion of the response
    Completed(Completion),
}

/// A fully assembled tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallEvent {
    /// Unique call identifier
    pub id: String,
    /// Tool name
    pub name: String,
    /// Parsed arguments object
    pub args: serde_json::Value,
}

/// Token usage reported by the provider, forwarded verbatim
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
}

/// Why and how a response ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Server-assigned response id, present only on stateful protocols
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    /// The decoder's view of why generation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<FinishReason>,
}

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation
    Stop,
    /// Hit the output token limit
    Length,
    /// The model called one or more tools
    ToolCalls,
}

impl FinishReason {
    /// Parse a provider finish/stop reason string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stop" | "end_turn" | "STOP" | "completed" => Some(Self::Stop),
            "length" | "max_tokens" | "MAX_TOKENS" => Some(Self::Length),
            "tool_calls" | "tool_use" => Some(Self::ToolCalls),
            _ => None,
        }
    }
}
