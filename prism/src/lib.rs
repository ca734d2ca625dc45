//! prism: one canonical conversation model, five LLM wire protocols
//!
//! The facade crate wires configuration, protocol adapters, and the retry
//! executor into a single client. Callers build canonical messages, pick a
//! configured model, and consume one canonical event stream regardless of
//! how the backend encodes deltas, reasoning, or tool calls.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod client;

pub use client::PrismClient;
pub use prism_config::{Config, ModelConfig, ProtocolKind, RetryConfig};
pub use prism_llm::{ChatEvent, ChatMessage, ChatRequest, EventStream, LlmError, Part, Role, ToolSpec};
