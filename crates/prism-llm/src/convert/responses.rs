//! Conversion between the canonical model and the `OpenAI` Responses API
//! wire format
//!
//! This is the one stateful protocol: requests may reference a server-held
//! previous response and send only the conversation delta. Slicing and
//! fallback live in [`crate::continuity`]; this module just honors the
//! `previous_response_id` it is given.

use prism_config::ModelConfig;

use super::{StreamDecoder, ensure_call_id, image_data_url, merge_extra};
use crate::decode::{CumulativeText, OutputGate, ThinkingTracker, ToolCallAssembler};
use crate::error::LlmError;
use crate::protocol::responses::{
    ResponsesContentPart, ResponsesItem, ResponsesRequest, ResponsesStreamEvent, ResponsesTool,
};
use crate::types::{ChatEvent, ChatRequest, Completion, FinishReason, Part, Role, ToolCallEvent, ToolChoice, Usage};

// -- Outbound: canonical request -> wire body --

/// Build the `/responses` request body
///
/// `previous_response_id` and the (possibly sliced) message window come
/// from the continuity tracker.
pub fn build_body(
    model_id: &str,
    config: &ModelConfig,
    request: &ChatRequest,
    previous_response_id: Option<&str>,
) -> Result<serde_json::Value, LlmError> {
    let mut instructions = None;
    let mut input = Vec::new();

    for msg in &request.messages {
        match msg.role {
            Role::System => instructions = Some(msg.text()),
            Role::User => input.push(user_item(msg)),
            Role::Assistant => assistant_items(msg, &mut input),
            Role::Tool => {
                for part in &msg.parts {
                    if let Part::ToolResult { call_id, text } = part {
                        input.push(ResponsesItem::FunctionCallOutput {
                            call_id: call_id.clone(),
                            output: text.clone(),
                        });
                    }
                }
            }
        }
    }

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(|t| ResponsesTool {
                    tool_type: "function".to_owned(),
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: Some(t.parameters.clone()),
                })
                .collect(),
        )
    };

    let reasoning = config.reasoning.effort.as_ref().map(|effort| {
        serde_json::json!({
            "effort": effort,
            "summary": "auto",
        })
    });

    let wire = ResponsesRequest {
        model: model_id.to_owned(),
        input,
        instructions,
        stream: Some(true),
        temperature: config.params.temperature,
        top_p: config.params.top_p,
        max_output_tokens: config.max_tokens,
        tools,
        tool_choice: request.tool_choice.as_ref().map(tool_choice_value),
        reasoning,
        previous_response_id: previous_response_id.map(ToOwned::to_owned),
    };

    let mut body = serde_json::to_value(&wire)
        .map_err(|e| LlmError::Config(format!("failed to encode request body: {e}")))?;
    merge_extra(&mut body, &config.extra);
    Ok(body)
}

fn user_item(msg: &crate::types::ChatMessage) -> ResponsesItem {
    let mut content = Vec::new();
    for part in &msg.parts {
        match part {
            Part::Text { text } => content.push(ResponsesContentPart::InputText { text: text.clone() }),
            Part::Image { mime_type, data } => content.push(ResponsesContentPart::InputImage {
                image_url: image_data_url(mime_type, data),
            }),
            _ => {}
        }
    }
    ResponsesItem::Message {
        role: "user".to_owned(),
        content,
    }
}

/// An assistant turn flattens into message and function-call items,
/// preserving part order for the calls
///
/// Reasoning items are never resent: the server already holds their state
/// when continuity is in play, and rejects bare reasoning otherwise.
fn assistant_items(msg: &crate::types::ChatMessage, input: &mut Vec<ResponsesItem>) {
    let text = msg.text();
    if !text.is_empty() {
        input.push(ResponsesItem::Message {
            role: "assistant".to_owned(),
            content: vec![ResponsesContentPart::OutputText { text }],
        });
    }

    for part in &msg.parts {
        if let Part::ToolCall { id, name, args } = part {
            input.push(ResponsesItem::FunctionCall {
                call_id: ensure_call_id(id),
                name: name.clone(),
                arguments: args.to_string(),
            });
        }
    }
}

/// Responses tool choice is flat, unlike Chat Completions
fn tool_choice_value(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::None => serde_json::Value::String("none".to_owned()),
        ToolChoice::Auto => serde_json::Value::String("auto".to_owned()),
        ToolChoice::Required => serde_json::Value::String("required".to_owned()),
        ToolChoice::Tool(name) => serde_json::json!({
            "type": "function",
            "name": name,
        }),
    }
}

// -- Inbound: wire stream -> canonical events --

/// Stateful decoder for the Responses SSE stream
pub struct ResponsesDecoder {
    tools: ToolCallAssembler,
    thinking: ThinkingTracker,
    text: CumulativeText,
    summary: CumulativeText,
    gate: OutputGate,
    response_id: Option<String>,
    completed: bool,
}

impl Default for ResponsesDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponsesDecoder {
    /// Create a decoder for one response
    pub fn new() -> Self {
        Self {
            tools: ToolCallAssembler::new(),
            thinking: ThinkingTracker::new(),
            text: CumulativeText::new(),
            summary: CumulativeText::new(),
            gate: OutputGate::default(),
            response_id: None,
            completed: false,
        }
    }

    fn push_text(&mut self, delta: String, out: &mut Vec<ChatEvent>) {
        if delta.is_empty() {
            return;
        }
        if let Some(end) = self.thinking.end() {
            out.push(end);
        }
        self.gate.note_text();
        out.push(ChatEvent::TextDelta(delta));
    }

    fn push_tool_call(&mut self, call: ToolCallEvent, out: &mut Vec<ChatEvent>) {
        if let Some(end) = self.thinking.end() {
            out.push(end);
        }
        if let Some(hint) = self.gate.hint_before_tool_call() {
            out.push(hint);
        }
        out.push(ChatEvent::ToolCall(call));
    }
}

impl StreamDecoder for ResponsesDecoder {
    #[allow(clippy::too_many_lines)]
    fn on_data(&mut self, data: &str) -> Result<Vec<ChatEvent>, LlmError> {
        if data == "[DONE]" {
            return Ok(Vec::new());
        }

        let Ok(event) = serde_json::from_str::<ResponsesStreamEvent>(data) else {
            tracing::debug!(data, "skipping unparseable responses event");
            return Ok(Vec::new());
        };

        let index = event.output_index.unwrap_or(0);
        let mut events = Vec::new();

        match event.event_type.as_str() {
            "response.created" => {
                if let Some(snapshot) = &event.response {
                    self.response_id = Some(snapshot.id.clone());
                }
            }

            "response.output_text.delta" => {
                if let Some(delta) = event.delta.as_ref().and_then(serde_json::Value::as_str) {
                    self.text.extend(delta);
                    self.push_text(delta.to_owned(), &mut events);
                }
            }

            // The done event repeats the full text; reconciliation emits
            // only whatever a lossy relay failed to deliver as deltas
            "response.output_text.done" => {
                if let Some(full) = &event.text
                    && let Some(delta) = self.text.reconcile(full)
                {
                    self.push_text(delta, &mut events);
                }
            }

            "response.reasoning_summary_part.added" => {
                // A new summary segment restarts the cumulative state
                self.summary.reset();
            }

            "response.reasoning_summary_text.delta" => {
                if let Some(delta) = event.delta.as_ref().and_then(serde_json::Value::as_str) {
                    self.summary.extend(delta);
                    events.push(self.thinking.thinking_delta(delta));
                }
            }

            "response.reasoning_summary_text.done" => {
                if let Some(full) = &event.text
                    && let Some(delta) = self.summary.reconcile(full)
                {
                    events.push(self.thinking.thinking_delta(&delta));
                }
            }

            "response.output_item.added" => {
                if let Some(item) = &event.item
                    && item.item_type == "function_call"
                    && let Some(call) = self.tools.set_identity(index, item.call_id.as_deref(), item.name.as_deref())
                {
                    self.push_tool_call(call, &mut events);
                }
            }

            "response.function_call_arguments.delta" => {
                if let Some(fragment) = event.delta.as_ref().and_then(serde_json::Value::as_str)
                    && let Some(call) = self.tools.append_args(index, fragment)
                {
                    self.push_tool_call(call, &mut events);
                }
            }

            "response.function_call_arguments.done" => {
                if let Some(arguments) = &event.arguments
                    && let Some(call) = self.tools.replace_args(index, arguments)
                {
                    self.push_tool_call(call, &mut events);
                }
            }

            "response.output_item.done" => {
                if let Some(item) = &event.item
                    && item.item_type == "function_call"
                {
                    if let Some(call) = self.tools.set_identity(index, item.call_id.as_deref(), item.name.as_deref()) {
                        self.push_tool_call(call, &mut events);
                    }
                    if let Some(arguments) = &item.arguments
                        && let Some(call) = self.tools.replace_args(index, arguments)
                    {
                        self.push_tool_call(call, &mut events);
                    }
                }
            }

            "response.completed" => {
                self.completed = true;
                if let Some(snapshot) = &event.response {
                    self.response_id = Some(snapshot.id.clone());
                    if let Some(usage) = &snapshot.usage {
                        events.push(ChatEvent::Usage(Usage {
                            prompt_tokens: usage.input_tokens,
                            completion_tokens: usage.output_tokens,
                        }));
                    }
                }
                for call in self.tools.flush_strict()? {
                    self.push_tool_call(call, &mut events);
                }
            }

            "response.failed" | "error" => {
                return Err(LlmError::Streaming(format!("provider reported stream failure: {data}")));
            }

            _ => {}
        }

        Ok(events)
    }

    fn finish(&mut self) -> Result<Vec<ChatEvent>, LlmError> {
        let mut events = Vec::new();

        if !self.completed {
            // The stream ended without response.completed; drop partial buffers
            for call in self.tools.flush_lenient() {
                self.push_tool_call(call, &mut events);
            }
        }
        events.extend(self.thinking.finish());

        let finish = if self.tools.emitted_any() {
            Some(FinishReason::ToolCalls)
        } else {
            Some(FinishReason::Stop)
        };
        events.push(ChatEvent::Completed(Completion {
            response_id: self.response_id.clone(),
            finish,
        }));
        Ok(events)
    }

    fn cancel(&mut self) -> Vec<ChatEvent> {
        self.thinking.finish()
    }
}
