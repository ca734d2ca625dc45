//! Canonical conversation and event types
//!
//! These types are provider-agnostic and serve as the normalized
//! representation that every wire format converts to and from.

pub mod event;
pub mod message;
pub mod request;
pub mod tool;

pub use event::{ChatEvent, Completion, FinishReason, ToolCallEvent, Usage};
pub use message::{ChatMessage, Part, Role};
pub use request::ChatRequest;
pub use tool::{ToolChoice, ToolSpec};
