//! Conversion between the canonical model and the `OpenAI` Chat
//! Completions wire format

use prism_config::{MaxTokensVariant, ModelConfig};

use super::{StreamDecoder, ensure_call_id, image_data_url, merge_extra};
use crate::decode::{CumulativeText, OutputGate, ThinkingTracker, ToolCallAssembler};
use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiContent, OpenAiContentPart, OpenAiFunction, OpenAiFunctionCall, OpenAiImageUrl, OpenAiMessage,
    OpenAiRequest, OpenAiStreamChunk, OpenAiStreamOptions, OpenAiTool, OpenAiToolCall,
};
use crate::types::{ChatEvent, ChatRequest, Completion, FinishReason, Part, Role, ToolCallEvent, ToolChoice, Usage};

// -- Outbound: canonical request -> wire body --

/// Build the `/chat/completions` request body
pub fn build_body(model_id: &str, config: &ModelConfig, request: &ChatRequest) -> Result<serde_json::Value, LlmError> {
    let messages = wire_messages(&request.messages, config.reasoning.include_in_request);

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(request.tools.iter().map(wire_tool).collect())
    };

    // Exactly one of the two max-token field variants goes on the wire
    let (max_tokens, max_completion_tokens) = match config.max_tokens_variant {
        MaxTokensVariant::MaxTokens => (config.max_tokens, None),
        MaxTokensVariant::MaxCompletionTokens => (None, config.max_tokens),
    };

    let wire = OpenAiRequest {
        model: model_id.to_owned(),
        messages,
        temperature: config.params.temperature,
        top_p: config.params.top_p,
        max_tokens,
        max_completion_tokens,
        stop: config.stop.clone(),
        frequency_penalty: config.params.frequency_penalty,
        presence_penalty: config.params.presence_penalty,
        stream: Some(true),
        tools,
        tool_choice: request.tool_choice.as_ref().map(tool_choice_value),
        stream_options: Some(OpenAiStreamOptions { include_usage: true }),
    };

    let mut body = serde_json::to_value(&wire)
        .map_err(|e| LlmError::Config(format!("failed to encode request body: {e}")))?;
    merge_extra(&mut body, &config.extra);
    Ok(body)
}

/// Convert canonical messages to `OpenAI` chat messages
///
/// System parts stay inline as system-role messages; this is the one
/// protocol that wants them in the message list.
fn wire_messages(messages: &[crate::types::ChatMessage], include_reasoning: bool) -> Vec<OpenAiMessage> {
    let mut wire = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => wire.push(OpenAiMessage {
                role: "system".to_owned(),
                content: Some(OpenAiContent::Text(msg.text())),
                reasoning_content: None,
                tool_calls: None,
                tool_call_id: None,
            }),
            Role::User => wire.push(user_message(msg)),
            Role::Assistant => wire.push(assistant_message(msg, include_reasoning)),
            Role::Tool => {
                // One tool-role message per result
                for part in &msg.parts {
                    if let Part::ToolResult { call_id, text } = part {
                        wire.push(OpenAiMessage {
                            role: "tool".to_owned(),
                            content: Some(OpenAiContent::Text(text.clone())),
                            reasoning_content: None,
                            tool_calls: None,
                            tool_call_id: Some(call_id.clone()),
                        });
                    }
                }
            }
        }
    }

    wire
}

fn user_message(msg: &crate::types::ChatMessage) -> OpenAiMessage {
    let mut parts = Vec::new();
    let mut has_image = false;

    for part in &msg.parts {
        match part {
            Part::Text { text } => parts.push(OpenAiContentPart::Text { text: text.clone() }),
            Part::Image { mime_type, data } => {
                has_image = true;
                parts.push(OpenAiContentPart::ImageUrl {
                    image_url: OpenAiImageUrl {
                        url: image_data_url(mime_type, data),
                    },
                });
            }
            _ => {}
        }
    }

    let content = if has_image {
        OpenAiContent::Parts(parts)
    } else {
        OpenAiContent::Text(msg.text())
    };

    OpenAiMessage {
        role: "user".to_owned(),
        content: Some(content),
        reasoning_content: None,
        tool_calls: None,
        tool_call_id: None,
    }
}

fn assistant_message(msg: &crate::types::ChatMessage, include_reasoning: bool) -> OpenAiMessage {
    let mut tool_calls = Vec::new();
    let mut reasoning = String::new();

    for part in &msg.parts {
        match part {
            Part::ToolCall { id, name, args } => tool_calls.push(OpenAiToolCall {
                id: ensure_call_id(id),
                tool_type: "function".to_owned(),
                function: OpenAiFunctionCall {
                    name: name.clone(),
                    arguments: args.to_string(),
                },
            }),
            Part::Thinking { text, .. } if include_reasoning => reasoning.push_str(text),
            _ => {}
        }
    }

    let text = msg.text();
    OpenAiMessage {
        role: "assistant".to_owned(),
        content: if text.is_empty() { None } else { Some(OpenAiContent::Text(text)) },
        reasoning_content: if reasoning.is_empty() { None } else { Some(reasoning) },
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        tool_call_id: None,
    }
}

fn wire_tool(tool: &crate::types::ToolSpec) -> OpenAiTool {
    OpenAiTool {
        tool_type: "function".to_owned(),
        function: OpenAiFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: Some(tool.parameters.clone()),
        },
    }
}

/// Convert the canonical tool choice to `OpenAI`'s flexible value
fn tool_choice_value(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::None => serde_json::Value::String("none".to_owned()),
        ToolChoice::Auto => serde_json::Value::String("auto".to_owned()),
        ToolChoice::Required => serde_json::Value::String("required".to_owned()),
        ToolChoice::Tool(name) => serde_json::json!({
            "type": "function",
            "function": {"name": name}
        }),
    }
}

// -- Inbound: wire stream -> canonical events --

/// Stateful decoder for the Chat Completions SSE stream
pub struct OpenAiChatDecoder {
    tools: ToolCallAssembler,
    thinking: ThinkingTracker,
    relay_reasoning: CumulativeText,
    gate: OutputGate,
    finish: Option<FinishReason>,
}

impl Default for OpenAiChatDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiChatDecoder {
    /// Create a decoder for one response
    pub fn new() -> Self {
        Self {
            tools: ToolCallAssembler::new(),
            // Reasoning may also arrive inline as literal <think> tags
            thinking: ThinkingTracker::with_inline_tags(),
            relay_reasoning: CumulativeText::new(),
            gate: OutputGate::default(),
            finish: None,
        }
    }

    fn push_routed(&mut self, routed: Vec<ChatEvent>, out: &mut Vec<ChatEvent>) {
        for event in routed {
            if matches!(event, ChatEvent::TextDelta(_)) {
                self.gate.note_text();
            }
            out.push(event);
        }
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

impl StreamDecoder for OpenAiChatDecoder {
    fn on_data(&mut self, data: &str) -> Result<Vec<ChatEvent>, LlmError> {
        if data == "[DONE]" {
            return Ok(Vec::new());
        }

        let Ok(chunk) = serde_json::from_str::<OpenAiStreamChunk>(data) else {
            tracing::debug!(data, "skipping unparseable chat completion chunk");
            return Ok(Vec::new());
        };

        let mut events = Vec::new();

        for choice in &chunk.choices {
            if let Some(reasoning) = &choice.delta.reasoning_content
                && !reasoning.is_empty()
            {
                self.relay_reasoning.extend(reasoning);
                events.push(self.thinking.thinking_delta(reasoning));
            }

            // Some relays resend the entire reasoning text on each update
            if let Some(reasoning) = &choice.delta.reasoning
                && let Some(delta) = self.relay_reasoning.reconcile(reasoning)
            {
                events.push(self.thinking.thinking_delta(&delta));
            }

            if let Some(content) = &choice.delta.content
                && !content.is_empty()
            {
                let routed = self.thinking.route_text(content);
                self.push_routed(routed, &mut events);
            }

            if let Some(tool_calls) = &choice.delta.tool_calls {
                for tc in tool_calls {
                    let (name, arguments) = tc
                        .function
                        .as_ref()
                        .map_or((None, None), |f| (f.name.as_deref(), f.arguments.as_deref()));

                    if let Some(call) = self.tools.set_identity(tc.index, tc.id.as_deref(), name) {
                        self.push_tool_call(call, &mut events);
                    }
                    if let Some(fragment) = arguments
                        && !fragment.is_empty()
                        && let Some(call) = self.tools.append_args(tc.index, fragment)
                    {
                        self.push_tool_call(call, &mut events);
                    }
                }
            }

            if let Some(reason) = &choice.finish_reason {
                self.finish = FinishReason::parse(reason);
                for call in self.tools.flush_strict()? {
                    self.push_tool_call(call, &mut events);
                }
            }
        }

        if let Some(usage) = &chunk.usage {
            events.push(ChatEvent::Usage(Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            }));
        }

        Ok(events)
    }

    fn finish(&mut self) -> Result<Vec<ChatEvent>, LlmError> {
        let mut events = Vec::new();
        let routed = self.thinking.finish();
        self.push_routed(routed, &mut events);

        // Anything still buffered at a benign end of stream is dropped
        for call in self.tools.flush_lenient() {
            self.push_tool_call(call, &mut events);
        }

        events.push(ChatEvent::Completed(Completion {
            response_id: None,
            finish: self.finish,
        }));
        Ok(events)
    }

    fn cancel(&mut self) -> Vec<ChatEvent> {
        self.thinking.finish()
    }
}
