use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool result
    Tool,
}

/// Message in a conversation: a role and an ordered sequence of parts
///
/// Adapters may regroup parts into provider-specific envelopes but never
/// reorder them semantically; tool results always follow the calls that
/// produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: Role,
    /// Ordered content parts
    pub parts: Vec<Part>,
}

/// Individual part within a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Plain text
    Text {
        /// The text string
        text: String,
    },
    /// Image bytes
    Image {
        /// MIME type (e.g. "image/png")
        mime_type: String,
        /// Raw image bytes, base64-encoded at the wire boundary
        data: Vec<u8>,
    },
    /// A tool call the assistant made
    ToolCall {
        /// Unique call identifier
        id: String,
        /// Tool name
        name: String,
        /// Arguments object
        args: serde_json::Value,
    },
    /// Result of a tool call
    ToolResult {
        /// Identifier of the originating call
        call_id: String,
        /// Output text
        text: String,
    },
    /// Model-internal reasoning text
    Thinking {
        /// The reasoning text
        text: String,
        /// Opaque continuation token some providers require to be echoed
        /// back on tool follow-ups
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Reference to a server-held response, enabling delta-only resubmission
    /// on stateful protocols
    ResponseRef {
        /// Model id the response belongs to
        model: String,
        /// Server-assigned response id
        response_id: String,
    },
}

impl ChatMessage {
    /// Create a system message with a single text part
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// Create a user message with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// Create an assistant message with a single text part
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// Create a tool message carrying one tool result
    pub fn tool_result(call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            parts: vec![Part::ToolResult {
                call_id: call_id.into(),
                text: text.into(),
            }],
        }
    }

    /// Concatenated text of all text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether every part of this message is a tool result
    pub fn is_tool_result_only(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(|p| matches!(p, Part::ToolResult { .. }))
    }

    /// The continuity reference carried by this message, if any
    pub fn response_ref(&self) -> Option<(&str, &str)> {
        self.parts.iter().find_map(|p| match p {
            Part::ResponseRef { model, response_id } => Some((model.as_str(), response_id.as_str())),
            _ => None,
        })
    }
}
