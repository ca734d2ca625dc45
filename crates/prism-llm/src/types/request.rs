use super::message::ChatMessage;
use super::tool::{ToolChoice, ToolSpec};

/// Canonical chat request handed to an adapter
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Conversation messages, in order
    pub messages: Vec<ChatMessage>,
    /// Tools available to the model
    pub tools: Vec<ToolSpec>,
    /// Tool selection policy
    pub tool_choice: Option<ToolChoice>,
}

impl ChatRequest {
    /// A request carrying only messages
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            tool_choice: None,
        }
    }
}
