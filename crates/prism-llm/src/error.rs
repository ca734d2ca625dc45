use std::collections::HashSet;

use thiserror::Error;

/// Errors that can occur while sending a request or decoding its stream
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing API key, invalid base URL, or other pre-flight problem
    #[error("configuration error: {0}")]
    Config(String),

    /// Network-level failure before a status code was received
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider returned a non-2xx status
    #[error("{url} returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
        /// Request URL
        url: String,
    },

    /// Malformed terminal tool-call JSON or other unrecoverable decode state
    #[error("decode error: {0}")]
    Decode(String),

    /// Error reading the streaming response body
    #[error("streaming error: {0}")]
    Streaming(String),
}

impl LlmError {
    /// Whether the retry executor may attempt this request again
    ///
    /// Transport failures are always retryable; status failures only when
    /// the code is in the configured set. Decode and config errors never.
    pub fn is_retryable(&self, retryable_statuses: &HashSet<u16>) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => retryable_statuses.contains(status),
            Self::Config(_) | Self::Decode(_) | Self::Streaming(_) => false,
        }
    }

    /// The HTTP status code, if this error carries one
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
