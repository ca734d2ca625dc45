//! Conversion between the canonical model and each wire format
//!
//! Each submodule is a symmetric pair: a pure request-body builder and a
//! stateful per-request stream decoder composing the algorithms in
//! [`crate::decode`].

pub mod anthropic;
pub mod google;
pub mod google_schema;
pub mod ollama;
pub mod openai;
pub mod responses;

use crate::error::LlmError;
use crate::types::ChatEvent;

/// Stateful per-request decoder turning provider stream payloads into
/// canonical events
///
/// `on_data` receives one framed payload (an SSE `data:` body or one JSON
/// line); `finish` runs once at end of stream; `cancel` runs instead of
/// `finish` when the caller aborts, flushing only the pending
/// end-of-reasoning state.
pub trait StreamDecoder: Send {
    /// Decode one framed payload
    fn on_data(&mut self, data: &str) -> Result<Vec<ChatEvent>, LlmError>;

    /// Flush at end of stream and emit the terminal completion
    fn finish(&mut self) -> Result<Vec<ChatEvent>, LlmError>;

    /// Flush pending reasoning state on cancellation
    fn cancel(&mut self) -> Vec<ChatEvent>;
}

/// Merge user-supplied extra parameters into a computed request body
///
/// Extras win: scalar and array values overwrite computed fields verbatim.
/// When both sides are objects the extra is merged into the computed
/// object recursively, so a partial reasoning-config object refines rather
/// than replaces the computed one.
pub fn merge_extra(body: &mut serde_json::Value, extra: &serde_json::Map<String, serde_json::Value>) {
    let Some(target) = body.as_object_mut() else {
        return;
    };
    for (key, value) in extra {
        match (target.get_mut(key), value) {
            (Some(serde_json::Value::Object(existing)), serde_json::Value::Object(incoming)) => {
                merge_objects(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Encode image bytes as a data URL
pub(crate) fn image_data_url(mime_type: &str, data: &[u8]) -> String {
    use base64::Engine as _;
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    format!("data:{mime_type};base64,{encoded}")
}

/// Use the wire call id, or synthesize one when the provider omitted it
pub(crate) fn ensure_call_id(id: &str) -> String {
    if id.is_empty() {
        crate::decode::synthesize_call_id()
    } else {
        id.to_owned()
    }
}

fn merge_objects(target: &mut serde_json::Map<String, serde_json::Value>, source: &serde_json::Map<String, serde_json::Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(serde_json::Value::Object(existing)), serde_json::Value::Object(incoming)) => {
                merge_objects(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extras_overwrite_scalars_verbatim() {
        let mut body = json!({"temperature": 0.7, "model": "m"});
        let extra = json!({"temperature": 0.2, "seed": 42});
        merge_extra(&mut body, extra.as_object().unwrap());
        assert_eq!(body, json!({"temperature": 0.2, "model": "m", "seed": 42}));
    }

    #[test]
    fn partial_object_merges_into_computed_object() {
        let mut body = json!({"reasoning": {"effort": "medium", "summary": "auto"}});
        let extra = json!({"reasoning": {"effort": "high"}});
        merge_extra(&mut body, extra.as_object().unwrap());
        assert_eq!(body, json!({"reasoning": {"effort": "high", "summary": "auto"}}));
    }

    #[test]
    fn object_replaces_scalar() {
        let mut body = json!({"stop": "end"});
        let extra = json!({"stop": {"sequences": ["a"]}});
        merge_extra(&mut body, extra.as_object().unwrap());
        assert_eq!(body, json!({"stop": {"sequences": ["a"]}}));
    }
}
