//! Conversion between the canonical model and the Anthropic Messages wire
//! format

use std::collections::HashMap;

use prism_config::ModelConfig;

use super::{StreamDecoder, ensure_call_id, merge_extra};
use crate::decode::{OutputGate, ThinkingTracker, ToolCallAssembler};
use crate::error::LlmError;
use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicImageSource, AnthropicMessage, AnthropicRequest, AnthropicStreamContentBlock,
    AnthropicStreamDelta, AnthropicStreamEvent, AnthropicTool, AnthropicToolChoice,
};
use crate::types::{ChatEvent, ChatRequest, Completion, FinishReason, Part, Role, ToolCallEvent, ToolChoice, Usage};

/// Anthropic requires `max_tokens`; used when the model config leaves it out
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Minimal thinking block content when reasoning inclusion is requested
/// but the turn carries none; the API rejects bare tool use otherwise
const THINKING_PLACEHOLDER: &str = "Next step.";

// -- Outbound: canonical request -> wire body --

/// Build the `/messages` request body
pub fn build_body(model_id: &str, config: &ModelConfig, request: &ChatRequest) -> Result<serde_json::Value, LlmError> {
    let mut system = None;
    let mut messages: Vec<AnthropicMessage> = Vec::new();

    for msg in &request.messages {
        match msg.role {
            Role::System => system = Some(msg.text()),
            Role::User => messages.push(AnthropicMessage {
                role: "user".to_owned(),
                content: user_blocks(msg),
            }),
            Role::Assistant => messages.push(AnthropicMessage {
                role: "assistant".to_owned(),
                content: assistant_blocks(msg, config.reasoning.include_in_request),
            }),
            Role::Tool => {
                let blocks = tool_result_blocks(msg);
                // Consecutive tool-result turns collapse into one user turn
                match messages.last_mut() {
                    Some(last) if is_tool_result_turn(last) => last.content.extend(blocks),
                    _ => messages.push(AnthropicMessage {
                        role: "user".to_owned(),
                        content: blocks,
                    }),
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
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.parameters.clone(),
                })
                .collect(),
        )
    };

    let wire = AnthropicRequest {
        model: model_id.to_owned(),
        max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        messages,
        temperature: config.params.temperature,
        top_p: config.params.top_p,
        top_k: config.params.top_k,
        stop_sequences: config.stop.clone(),
        stream: Some(true),
        tools,
        tool_choice: request.tool_choice.as_ref().map(wire_tool_choice),
    };

    let mut body = serde_json::to_value(&wire)
        .map_err(|e| LlmError::Config(format!("failed to encode request body: {e}")))?;
    merge_extra(&mut body, &config.extra);
    Ok(body)
}

fn is_tool_result_turn(msg: &AnthropicMessage) -> bool {
    msg.role == "user"
        && !msg.content.is_empty()
        && msg
            .content
            .iter()
            .all(|b| matches!(b, AnthropicContentBlock::ToolResult { .. }))
}

fn user_blocks(msg: &crate::types::ChatMessage) -> Vec<AnthropicContentBlock> {
    let mut blocks = Vec::new();
    for part in &msg.parts {
        match part {
            Part::Text { text } => blocks.push(AnthropicContentBlock::Text { text: text.clone() }),
            Part::Image { mime_type, data } => {
                use base64::Engine as _;
                blocks.push(AnthropicContentBlock::Image {
                    source: AnthropicImageSource {
                        source_type: "base64".to_owned(),
                        media_type: mime_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(data),
                    },
                });
            }
            _ => {}
        }
    }
    if blocks.is_empty() {
        blocks.push(AnthropicContentBlock::Text { text: String::new() });
    }
    blocks
}

fn assistant_blocks(msg: &crate::types::ChatMessage, include_reasoning: bool) -> Vec<AnthropicContentBlock> {
    let mut blocks = Vec::new();
    let mut has_thinking = false;
    let mut has_tool_use = false;

    for part in &msg.parts {
        match part {
            Part::Text { text } => {
                if !text.is_empty() {
                    blocks.push(AnthropicContentBlock::Text { text: text.clone() });
                }
            }
            Part::Thinking { text, signature } if include_reasoning => {
                has_thinking = true;
                blocks.push(AnthropicContentBlock::Thinking {
                    thinking: text.clone(),
                    signature: signature.clone(),
                });
            }
            Part::ToolCall { id, name, args } => {
                has_tool_use = true;
                blocks.push(AnthropicContentBlock::ToolUse {
                    id: ensure_call_id(id),
                    name: name.clone(),
                    input: args.clone(),
                });
            }
            _ => {}
        }
    }

    if include_reasoning && has_tool_use && !has_thinking {
        blocks.insert(
            0,
            AnthropicContentBlock::Thinking {
                thinking: THINKING_PLACEHOLDER.to_owned(),
                signature: None,
            },
        );
    }

    if blocks.is_empty() {
        blocks.push(AnthropicContentBlock::Text { text: String::new() });
    }
    blocks
}

/// A tool result keeps its call id even when nothing matched it; the API
/// requires one result block per outstanding call
fn tool_result_blocks(msg: &crate::types::ChatMessage) -> Vec<AnthropicContentBlock> {
    msg.parts
        .iter()
        .filter_map(|part| match part {
            Part::ToolResult { call_id, text } => Some(AnthropicContentBlock::ToolResult {
                tool_use_id: call_id.clone(),
                content: if text.is_empty() { None } else { Some(text.clone()) },
            }),
            _ => None,
        })
        .collect()
}

fn wire_tool_choice(choice: &ToolChoice) -> AnthropicToolChoice {
    match choice {
        // Anthropic has no "none" mode; map it to auto
        ToolChoice::None | ToolChoice::Auto => AnthropicToolChoice {
            choice_type: "auto".to_owned(),
            name: None,
        },
        ToolChoice::Required => AnthropicToolChoice {
            choice_type: "any".to_owned(),
            name: None,
        },
        ToolChoice::Tool(name) => AnthropicToolChoice {
            choice_type: "tool".to_owned(),
            name: Some(name.clone()),
        },
    }
}

// -- Inbound: wire stream -> canonical events --

/// What kind of content block a stream index carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    ToolUse,
    Thinking,
    Skipped,
}

/// Stateful decoder for the Anthropic Messages SSE stream
pub struct AnthropicDecoder {
    tools: ToolCallAssembler,
    thinking: ThinkingTracker,
    gate: OutputGate,
    blocks: HashMap<u32, BlockKind>,
    finish: Option<FinishReason>,
}

impl Default for AnthropicDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnthropicDecoder {
    /// Create a decoder for one response
    pub fn new() -> Self {
        Self {
            tools: ToolCallAssembler::new(),
            thinking: ThinkingTracker::new(),
            gate: OutputGate::default(),
            blocks: HashMap::new(),
            finish: None,
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

impl StreamDecoder for AnthropicDecoder {
    #[allow(clippy::too_many_lines)]
    fn on_data(&mut self, data: &str) -> Result<Vec<ChatEvent>, LlmError> {
        let Ok(event) = serde_json::from_str::<AnthropicStreamEvent>(data) else {
            tracing::debug!(data, "skipping unparseable messages event");
            return Ok(Vec::new());
        };

        let mut events = Vec::new();

        match event {
            AnthropicStreamEvent::MessageStart { .. } | AnthropicStreamEvent::Ping => {}

            AnthropicStreamEvent::ContentBlockStart { index, content_block } => match content_block {
                AnthropicStreamContentBlock::Text { text } => {
                    self.blocks.insert(index, BlockKind::Text);
                    if !text.is_empty() {
                        if let Some(end) = self.thinking.end() {
                            events.push(end);
                        }
                        self.gate.note_text();
                        events.push(ChatEvent::TextDelta(text));
                    }
                }
                AnthropicStreamContentBlock::ToolUse { id, name } => {
                    self.blocks.insert(index, BlockKind::ToolUse);
                    if let Some(call) = self.tools.set_identity(index, Some(&id), Some(&name)) {
                        self.push_tool_call(call, &mut events);
                    }
                }
                AnthropicStreamContentBlock::Thinking { thinking } => {
                    self.blocks.insert(index, BlockKind::Thinking);
                    if !thinking.is_empty() {
                        events.push(self.thinking.thinking_delta(&thinking));
                    }
                }
                AnthropicStreamContentBlock::RedactedThinking {} => {
                    self.blocks.insert(index, BlockKind::Skipped);
                }
            },

            AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
                AnthropicStreamDelta::TextDelta { text } => {
                    if !text.is_empty() {
                        if let Some(end) = self.thinking.end() {
                            events.push(end);
                        }
                        self.gate.note_text();
                        events.push(ChatEvent::TextDelta(text));
                    }
                }
                AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                    if let Some(call) = self.tools.append_args(index, &partial_json) {
                        self.push_tool_call(call, &mut events);
                    }
                }
                AnthropicStreamDelta::ThinkingDelta { thinking } => {
                    events.push(self.thinking.thinking_delta(&thinking));
                }
                AnthropicStreamDelta::SignatureDelta { signature } => {
                    self.thinking.set_signature(&signature);
                }
            },

            AnthropicStreamEvent::ContentBlockStop { index } => {
                if self.blocks.get(&index) == Some(&BlockKind::Thinking)
                    && let Some(end) = self.thinking.end()
                {
                    events.push(end);
                }
            }

            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = delta.stop_reason.as_deref() {
                    self.finish = FinishReason::parse(reason);
                    for call in self.tools.flush_strict()? {
                        self.push_tool_call(call, &mut events);
                    }
                }
                if let Some(usage) = usage {
                    events.push(ChatEvent::Usage(Usage {
                        prompt_tokens: usage.input_tokens,
                        completion_tokens: usage.output_tokens,
                    }));
                }
            }

            AnthropicStreamEvent::MessageStop => {}

            AnthropicStreamEvent::Error { error } => {
                return Err(LlmError::Streaming(format!("provider reported stream error: {error}")));
            }
        }

        Ok(events)
    }

    fn finish(&mut self) -> Result<Vec<ChatEvent>, LlmError> {
        let mut events = Vec::new();
        for call in self.tools.flush_lenient() {
            self.push_tool_call(call, &mut events);
        }
        events.extend(self.thinking.finish());
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
