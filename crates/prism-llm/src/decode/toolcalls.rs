use std::collections::{BTreeMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::LlmError;
use crate::types::ToolCallEvent;

/// Synthesize a process-unique tool call id for providers that omit one
pub fn synthesize_call_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("call_{millis}_{}", &suffix[..8])
}

/// Partially received tool call, keyed by the provider's stream index
#[derive(Debug, Default)]
struct ToolCallBuffer {
    id: Option<String>,
    name: Option<String>,
    args: String,
}

/// Assembles streamed tool-call fragments into complete calls
///
/// A call is emitted as soon as its accumulated arguments parse as a
/// complete JSON object, rather than waiting for an explicit end-of-call
/// signal. Once an index has emitted, further deltas for it are ignored,
/// which also swallows trailing "done" events that repeat the full
/// argument string.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    buffers: BTreeMap<u32, ToolCallBuffer>,
    completed: HashSet<u32>,
}

impl ToolCallAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the id and/or name for a stream index, emitting the call if
    /// its arguments happen to be complete already
    pub fn set_identity(&mut self, index: u32, id: Option<&str>, name: Option<&str>) -> Option<ToolCallEvent> {
        if self.completed.contains(&index) {
            return None;
        }
        let buffer = self.buffers.entry(index).or_default();
        if let Some(id) = id {
            buffer.id.get_or_insert_with(|| id.to_owned());
        }
        if let Some(name) = name {
            buffer.name.get_or_insert_with(|| name.to_owned());
        }
        self.try_emit(index, false)
    }

    /// Append an argument fragment for a stream index
    pub fn append_args(&mut self, index: u32, fragment: &str) -> Option<ToolCallEvent> {
        if self.completed.contains(&index) {
            return None;
        }
        self.buffers.entry(index).or_default().args.push_str(fragment);
        self.try_emit(index, false)
    }

    /// Replace the accumulated arguments wholesale (for "done"-style events
    /// that carry the full argument string)
    pub fn replace_args(&mut self, index: u32, args: &str) -> Option<ToolCallEvent> {
        if self.completed.contains(&index) {
            return None;
        }
        let buffer = self.buffers.entry(index).or_default();
        buffer.args.clear();
        buffer.args.push_str(args);
        self.try_emit(index, false)
    }

    /// Whether any call has been emitted from this response
    pub fn emitted_any(&self) -> bool {
        !self.completed.is_empty()
    }

    /// Flush after an explicit finish signal; a buffer that still does not
    /// parse will never complete, so it is a hard decode error
    pub fn flush_strict(&mut self) -> Result<Vec<ToolCallEvent>, LlmError> {
        let mut events = Vec::new();
        let pending: Vec<u32> = self
            .buffers
            .keys()
            .copied()
            .filter(|i| !self.completed.contains(i))
            .collect();

        for index in pending {
            match self.try_emit(index, true) {
                Some(event) => events.push(event),
                None => {
                    let buffer = &self.buffers[&index];
                    return Err(LlmError::Decode(format!(
                        "tool call {} ended with incomplete arguments: {:?}",
                        buffer.name.as_deref().unwrap_or("<unnamed>"),
                        buffer.args,
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Flush at a benign end-of-stream sentinel; incomplete buffers are
    /// dropped silently
    pub fn flush_lenient(&mut self) -> Vec<ToolCallEvent> {
        let pending: Vec<u32> = self
            .buffers
            .keys()
            .copied()
            .filter(|i| !self.completed.contains(i))
            .collect();

        pending
            .into_iter()
            .filter_map(|index| self.try_emit(index, true))
            .collect()
    }

    /// Emit the call at `index` if its name is known and its arguments form
    /// a complete JSON object
    ///
    /// An empty accumulator only counts as "no arguments" when flushing
    /// (`allow_empty`); mid-stream it means fragments are still arriving.
    fn try_emit(&mut self, index: u32, allow_empty: bool) -> Option<ToolCallEvent> {
        let buffer = self.buffers.get(&index)?;
        let name = buffer.name.clone()?;

        let args: serde_json::Value = if buffer.args.is_empty() {
            if !allow_empty {
                return None;
            }
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            let parsed = serde_json::from_str(&buffer.args).ok()?;
            if !matches!(parsed, serde_json::Value::Object(_)) {
                return None;
            }
            parsed
        };

        let id = self
            .buffers
            .get_mut(&index)
            .and_then(|b| b.id.take())
            .unwrap_or_else(synthesize_call_id);

        self.completed.insert(index);
        Some(ToolCallEvent { id, name, args })
    }
}
