//! Conversion between the canonical model and the Ollama chat wire format

use prism_config::ModelConfig;

use super::{StreamDecoder, merge_extra};
use crate::decode::{OutputGate, ThinkingTracker, synthesize_call_id};
use crate::error::LlmError;
use crate::protocol::ollama::{OllamaChatChunk, OllamaChatRequest, OllamaMessage};
use crate::protocol::openai::{OpenAiFunction, OpenAiTool};
use crate::types::{ChatEvent, ChatMessage, ChatRequest, Completion, FinishReason, Part, Role, ToolCallEvent, Usage};

// -- Outbound: canonical request -> wire body --

/// Build the `/api/chat` request body
pub fn build_body(model_id: &str, config: &ModelConfig, request: &ChatRequest) -> Result<serde_json::Value, LlmError> {
    let mut messages = Vec::new();

    for msg in &request.messages {
        match msg.role {
            Role::System => messages.push(OllamaMessage {
                role: "system".to_owned(),
                content: msg.text(),
                images: None,
                tool_calls: None,
                thinking: None,
            }),
            Role::User => messages.push(user_message(msg)),
            Role::Assistant => messages.push(assistant_message(msg, config.reasoning.include_in_request)),
            Role::Tool => {
                for part in &msg.parts {
                    if let Part::ToolResult { text, .. } = part {
                        messages.push(OllamaMessage {
                            role: "tool".to_owned(),
                            content: text.clone(),
                            images: None,
                            tool_calls: None,
                            thinking: None,
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
                .map(|t| OpenAiTool {
                    tool_type: "function".to_owned(),
                    function: OpenAiFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: Some(t.parameters.clone()),
                    },
                })
                .collect(),
        )
    };

    let options = runtime_options(config);

    let wire = OllamaChatRequest {
        model: model_id.to_owned(),
        messages,
        stream: true,
        tools,
        options: if options.is_empty() { None } else { Some(options) },
    };

    let mut body = serde_json::to_value(&wire)
        .map_err(|e| LlmError::Config(format!("failed to encode request body: {e}")))?;
    merge_extra(&mut body, &config.extra);
    Ok(body)
}

/// Map sampling parameters to Ollama's runtime option names
fn runtime_options(config: &ModelConfig) -> serde_json::Map<String, serde_json::Value> {
    let mut options = serde_json::Map::new();
    let params = &config.params;

    if let Some(v) = params.temperature {
        options.insert("temperature".to_owned(), v.into());
    }
    if let Some(v) = params.top_p {
        options.insert("top_p".to_owned(), v.into());
    }
    if let Some(v) = params.top_k {
        options.insert("top_k".to_owned(), v.into());
    }
    if let Some(v) = params.min_p {
        options.insert("min_p".to_owned(), v.into());
    }
    if let Some(v) = params.repetition_penalty {
        options.insert("repeat_penalty".to_owned(), v.into());
    }
    if let Some(v) = config.max_tokens {
        options.insert("num_predict".to_owned(), v.into());
    }
    if let Some(stop) = &config.stop {
        options.insert("stop".to_owned(), stop.clone().into());
    }

    options
}

fn user_message(msg: &ChatMessage) -> OllamaMessage {
    use base64::Engine as _;

    let mut images = Vec::new();
    for part in &msg.parts {
        if let Part::Image { data, .. } = part {
            images.push(base64::engine::general_purpose::STANDARD.encode(data));
        }
    }

    OllamaMessage {
        role: "user".to_owned(),
        content: msg.text(),
        images: if images.is_empty() { None } else { Some(images) },
        tool_calls: None,
        thinking: None,
    }
}

fn assistant_message(msg: &ChatMessage, include_reasoning: bool) -> OllamaMessage {
    use crate::protocol::ollama::{OllamaFunctionCall, OllamaToolCall};

    let mut tool_calls = Vec::new();
    let mut thinking = String::new();

    for part in &msg.parts {
        match part {
            Part::ToolCall { name, args, .. } => tool_calls.push(OllamaToolCall {
                function: OllamaFunctionCall {
                    name: name.clone(),
                    arguments: args.clone(),
                },
            }),
            Part::Thinking { text, .. } if include_reasoning => thinking.push_str(text),
            _ => {}
        }
    }

    OllamaMessage {
        role: "assistant".to_owned(),
        content: msg.text(),
        images: None,
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        thinking: if thinking.is_empty() { None } else { Some(thinking) },
    }
}

// -- Inbound: wire stream -> canonical events --

/// Stateful decoder for the Ollama JSON-lines stream
pub struct OllamaDecoder {
    thinking: ThinkingTracker,
    gate: OutputGate,
    finish: Option<FinishReason>,
    usage: Option<Usage>,
    emitted_tool_call: bool,
    done: bool,
}

impl Default for OllamaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaDecoder {
    /// Create a decoder for one response
    pub fn new() -> Self {
        Self {
            // Local models emit reasoning as literal <think> tags in content
            thinking: ThinkingTracker::with_inline_tags(),
            gate: OutputGate::default(),
            finish: None,
            usage: None,
            emitted_tool_call: false,
            done: false,
        }
    }
}

impl StreamDecoder for OllamaDecoder {
    fn on_data(&mut self, data: &str) -> Result<Vec<ChatEvent>, LlmError> {
        let Ok(chunk) = serde_json::from_str::<OllamaChatChunk>(data) else {
            tracing::debug!(data, "skipping unparseable chat line");
            return Ok(Vec::new());
        };

        let mut events = Vec::new();

        if let Some(message) = &chunk.message {
            if let Some(thinking) = &message.thinking
                && !thinking.is_empty()
            {
                events.push(self.thinking.thinking_delta(thinking));
            }

            if !message.content.is_empty() {
                for event in self.thinking.route_text(&message.content) {
                    if matches!(event, ChatEvent::TextDelta(_)) {
                        self.gate.note_text();
                    }
                    events.push(event);
                }
            }

            if let Some(tool_calls) = &message.tool_calls {
                for call in tool_calls {
                    if let Some(end) = self.thinking.end() {
                        events.push(end);
                    }
                    if let Some(hint) = self.gate.hint_before_tool_call() {
                        events.push(hint);
                    }
                    self.emitted_tool_call = true;
                    events.push(ChatEvent::ToolCall(ToolCallEvent {
                        // Ollama assigns no call id
                        id: synthesize_call_id(),
                        name: call.function.name.clone(),
                        args: if call.function.arguments.is_null() {
                            serde_json::json!({})
                        } else {
                            call.function.arguments.clone()
                        },
                    }));
                }
            }
        }

        if chunk.done {
            self.done = true;
            self.finish = chunk.done_reason.as_deref().and_then(FinishReason::parse);
            if chunk.prompt_eval_count.is_some() || chunk.eval_count.is_some() {
                self.usage = Some(Usage {
                    prompt_tokens: chunk.prompt_eval_count.unwrap_or(0),
                    completion_tokens: chunk.eval_count.unwrap_or(0),
                });
            }
        }

        Ok(events)
    }

    fn finish(&mut self) -> Result<Vec<ChatEvent>, LlmError> {
        let mut events = self.thinking.finish();

        if let Some(usage) = self.usage.take() {
            events.push(ChatEvent::Usage(usage));
        }

        let finish = if self.emitted_tool_call {
            Some(FinishReason::ToolCalls)
        } else if self.done {
            self.finish.or(Some(FinishReason::Stop))
        } else {
            self.finish
        };
        events.push(ChatEvent::Completed(Completion {
            response_id: None,
            finish,
        }));
        Ok(events)
    }

    fn cancel(&mut self) -> Vec<ChatEvent> {
        self.thinking.finish()
    }
}
