//! Conversion between the canonical model and the Google Generative
//! Language wire format

use prism_config::ModelConfig;

use super::{StreamDecoder, google_schema, merge_extra};
use crate::decode::{OutputGate, ThinkingTracker, synthesize_call_id};
use crate::error::LlmError;
use crate::protocol::google::{
    GoogleContent, GoogleFunctionCall, GoogleFunctionCallingConfig, GoogleFunctionDeclaration, GoogleFunctionResponse,
    GoogleGenerationConfig, GoogleInlineData, GooglePart, GoogleRequest, GoogleResponse, GoogleTool, GoogleToolConfig,
};
use crate::toolmeta;
use crate::types::{ChatEvent, ChatMessage, ChatRequest, Completion, FinishReason, Part, Role, ToolCallEvent, ToolChoice, Usage};

/// Thought text sent when reasoning inclusion is requested but the turn
/// carries none; the API rejects signed tool calls with no thought at all
const THOUGHT_PLACEHOLDER: &str = "Next step.";

// -- Outbound: canonical request -> wire body --

/// Build the `:streamGenerateContent` request body
pub fn build_body(config: &ModelConfig, request: &ChatRequest) -> Result<serde_json::Value, LlmError> {
    let mut system_instruction = None;
    let mut contents: Vec<GoogleContent> = Vec::new();

    for msg in &request.messages {
        match msg.role {
            Role::System => {
                system_instruction = Some(GoogleContent {
                    role: None,
                    parts: vec![GooglePart::text(msg.text())],
                });
            }
            Role::User => contents.push(GoogleContent {
                role: Some("user".to_owned()),
                parts: user_parts(msg),
            }),
            Role::Assistant => contents.push(GoogleContent {
                role: Some("model".to_owned()),
                parts: assistant_parts(msg, config.reasoning.include_in_request),
            }),
            Role::Tool => {
                let parts = function_response_parts(msg, &request.messages);
                // Gemini requires all pending function responses in one turn
                match contents.last_mut() {
                    Some(last) if is_function_response_turn(last) => last.parts.extend(parts),
                    _ => contents.push(GoogleContent {
                        role: Some("function".to_owned()),
                        parts,
                    }),
                }
            }
        }
    }

    let generation_config = Some(GoogleGenerationConfig {
        temperature: config.params.temperature,
        top_p: config.params.top_p,
        top_k: config.params.top_k,
        max_output_tokens: config.max_tokens,
        stop_sequences: config.stop.clone(),
    });

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(vec![GoogleTool {
            function_declarations: request
                .tools
                .iter()
                .map(|t| GoogleFunctionDeclaration {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: Some(google_schema::sanitize(&t.parameters)),
                })
                .collect(),
        }])
    };

    let tool_config = request.tool_choice.as_ref().map(|choice| {
        let (mode, allowed_function_names) = match choice {
            ToolChoice::None => ("NONE".to_owned(), None),
            ToolChoice::Auto => ("AUTO".to_owned(), None),
            ToolChoice::Required => ("ANY".to_owned(), None),
            ToolChoice::Tool(name) => ("ANY".to_owned(), Some(vec![name.clone()])),
        };
        GoogleToolConfig {
            function_calling_config: GoogleFunctionCallingConfig {
                mode,
                allowed_function_names,
            },
        }
    });

    let wire = GoogleRequest {
        contents,
        system_instruction,
        generation_config,
        tools,
        tool_config,
    };

    let mut body = serde_json::to_value(&wire)
        .map_err(|e| LlmError::Config(format!("failed to encode request body: {e}")))?;
    merge_extra(&mut body, &config.extra);
    Ok(body)
}

fn is_function_response_turn(content: &GoogleContent) -> bool {
    !content.parts.is_empty() && content.parts.iter().all(|p| p.function_response.is_some())
}

fn user_parts(msg: &ChatMessage) -> Vec<GooglePart> {
    use base64::Engine as _;

    let mut parts = Vec::new();
    for part in &msg.parts {
        match part {
            Part::Text { text } => parts.push(GooglePart::text(text.clone())),
            Part::Image { mime_type, data } => parts.push(GooglePart {
                inline_data: Some(GoogleInlineData {
                    mime_type: mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(data),
                }),
                ..GooglePart::default()
            }),
            _ => {}
        }
    }
    if parts.is_empty() {
        parts.push(GooglePart::text(String::new()));
    }
    parts
}

fn assistant_parts(msg: &ChatMessage, include_reasoning: bool) -> Vec<GooglePart> {
    let mut parts = Vec::new();
    let mut has_thought = false;
    let mut has_call = false;

    for part in &msg.parts {
        match part {
            Part::Text { text } => {
                if !text.is_empty() {
                    parts.push(GooglePart::text(text.clone()));
                }
            }
            Part::Thinking { text, signature } if include_reasoning => {
                has_thought = true;
                parts.push(GooglePart::thought(text.clone(), signature.clone()));
            }
            Part::ToolCall { id, name, args } => {
                has_call = true;
                // The continuation signature recorded at decode time rides
                // on the function call part
                let signature = toolmeta::global().get(id).and_then(|meta| meta.signature);
                parts.push(GooglePart {
                    function_call: Some(GoogleFunctionCall {
                        name: name.clone(),
                        args: args.clone(),
                    }),
                    thought_signature: signature,
                    ..GooglePart::default()
                });
            }
            _ => {}
        }
    }

    if include_reasoning && has_call && !has_thought {
        parts.insert(0, GooglePart::thought(THOUGHT_PLACEHOLDER.to_owned(), None));
    }

    if parts.is_empty() {
        parts.push(GooglePart::text(String::new()));
    }
    parts
}

/// Convert tool results to function response parts
///
/// Gemini pairs responses by function name, which the canonical result
/// does not carry: the name is recovered from the originating call in
/// history, then from the metadata cache, and as a last resort the call id
/// itself keys an empty best-effort response rather than dropping the
/// turn.
fn function_response_parts(msg: &ChatMessage, history: &[ChatMessage]) -> Vec<GooglePart> {
    msg.parts
        .iter()
        .filter_map(|part| match part {
            Part::ToolResult { call_id, text } => {
                let name = find_call_name(call_id, history)
                    .or_else(|| toolmeta::global().get(call_id).map(|meta| meta.name))
                    .unwrap_or_else(|| call_id.clone());

                let response = serde_json::from_str::<serde_json::Value>(text)
                    .ok()
                    .filter(serde_json::Value::is_object)
                    .unwrap_or_else(|| serde_json::json!({ "result": text }));

                Some(GooglePart {
                    function_response: Some(GoogleFunctionResponse { name, response }),
                    ..GooglePart::default()
                })
            }
            _ => None,
        })
        .collect()
}

fn find_call_name(call_id: &str, history: &[ChatMessage]) -> Option<String> {
    history.iter().rev().find_map(|msg| {
        msg.parts.iter().find_map(|part| match part {
            Part::ToolCall { id, name, .. } if id == call_id => Some(name.clone()),
            _ => None,
        })
    })
}

// -- Inbound: wire stream -> canonical events --

/// Stateful decoder for the Gemini SSE stream
pub struct GoogleDecoder {
    thinking: ThinkingTracker,
    gate: OutputGate,
    finish: Option<FinishReason>,
    usage: Option<Usage>,
    thought_text: String,
    thought_signature: Option<String>,
    emitted_tool_call: bool,
}

impl Default for GoogleDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleDecoder {
    /// Create a decoder for one response
    pub fn new() -> Self {
        Self {
            thinking: ThinkingTracker::new(),
            gate: OutputGate::default(),
            finish: None,
            usage: None,
            thought_text: String::new(),
            thought_signature: None,
            emitted_tool_call: false,
        }
    }
}

impl StreamDecoder for GoogleDecoder {
    fn on_data(&mut self, data: &str) -> Result<Vec<ChatEvent>, LlmError> {
        let Ok(chunk) = serde_json::from_str::<GoogleResponse>(data) else {
            tracing::debug!(data, "skipping unparseable generateContent chunk");
            return Ok(Vec::new());
        };

        let mut events = Vec::new();

        for candidate in &chunk.candidates {
            if let Some(content) = &candidate.content {
                for part in &content.parts {
                    if let Some(signature) = &part.thought_signature {
                        self.thought_signature = Some(signature.clone());
                    }

                    if let Some(call) = &part.function_call {
                        if let Some(end) = self.thinking.end() {
                            events.push(end);
                        }
                        if let Some(hint) = self.gate.hint_before_tool_call() {
                            events.push(hint);
                        }

                        // Gemini assigns no call id; synthesize one and
                        // remember the pairing state it stands for
                        let id = synthesize_call_id();
                        let thought = if self.thought_text.is_empty() {
                            None
                        } else {
                            Some(std::mem::take(&mut self.thought_text))
                        };
                        toolmeta::global().insert(&id, &call.name, self.thought_signature.take(), thought);

                        self.emitted_tool_call = true;
                        events.push(ChatEvent::ToolCall(ToolCallEvent {
                            id,
                            name: call.name.clone(),
                            args: if call.args.is_null() {
                                serde_json::json!({})
                            } else {
                                call.args.clone()
                            },
                        }));
                    } else if let Some(text) = &part.text
                        && !text.is_empty()
                    {
                        if part.thought.unwrap_or(false) {
                            self.thought_text.push_str(text);
                            events.push(self.thinking.thinking_delta(text));
                        } else {
                            if let Some(end) = self.thinking.end() {
                                events.push(end);
                            }
                            self.gate.note_text();
                            events.push(ChatEvent::TextDelta(text.clone()));
                        }
                    }
                }
            }

            if let Some(reason) = candidate.finish_reason.as_deref() {
                self.finish = FinishReason::parse(reason);
            }
        }

        if let Some(usage) = &chunk.usage_metadata {
            self.usage = Some(Usage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
            });
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_config() -> ModelConfig {
        serde_json::from_value(json!({"protocol": "google"})).unwrap()
    }

    fn message(role: Role, parts: Vec<Part>) -> ChatMessage {
        ChatMessage { role, parts }
    }

    #[test]
    fn tool_schemas_are_sanitized_for_the_dialect() {
        let request = ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            tools: vec![crate::types::ToolSpec {
                name: "lookup".to_owned(),
                description: None,
                parameters: json!({
                    "type": "object",
                    "properties": {"q": {"type": ["string", "null"]}}
                }),
            }],
            tool_choice: None,
        };

        let body = build_body(&base_config(), &request).unwrap();
        let params = &body["tools"][0]["functionDeclarations"][0]["parameters"];
        assert_eq!(params["properties"]["q"], json!({"type": "STRING", "nullable": true}));
    }

    #[test]
    fn consecutive_tool_results_share_one_function_turn() {
        let request = ChatRequest::new(vec![
            message(
                Role::Assistant,
                vec![
                    Part::ToolCall {
                        id: "a".to_owned(),
                        name: "one".to_owned(),
                        args: json!({}),
                    },
                    Part::ToolCall {
                        id: "b".to_owned(),
                        name: "two".to_owned(),
                        args: json!({}),
                    },
                ],
            ),
            ChatMessage::tool_result("a", "1"),
            ChatMessage::tool_result("b", "2"),
        ]);

        let body = build_body(&base_config(), &request).unwrap();
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        let responses = contents[1]["parts"].as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["functionResponse"]["name"], json!("one"));
        assert_eq!(responses[1]["functionResponse"]["name"], json!("two"));
    }

    #[test]
    fn unmatched_tool_result_keeps_the_turn() {
        let request = ChatRequest::new(vec![ChatMessage::tool_result("ghost", "")]);
        let body = build_body(&base_config(), &request).unwrap();
        // Best effort: keyed by the call id with an empty result
        assert_eq!(
            body["contents"][0]["parts"][0]["functionResponse"]["name"],
            json!("ghost")
        );
    }

    #[test]
    fn thought_parts_route_to_reasoning_then_call() {
        let mut decoder = GoogleDecoder::new();

        let chunk = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "weighing", "thought": true},
                        {"functionCall": {"name": "probe", "args": {"x": 1}}, "thoughtSignature": "sig-3"}
                    ]
                }
            }]
        });
        let events = decoder.on_data(&chunk.to_string()).unwrap();

        assert_eq!(events[0], ChatEvent::ThinkingDelta("weighing".to_owned()));
        assert_eq!(events[1], ChatEvent::ThinkingEnd { signature: None });
        let ChatEvent::ToolCall(call) = &events[2] else {
            panic!("expected tool call, got {:?}", events[2]);
        };
        assert_eq!(call.name, "probe");
        assert_eq!(call.args, json!({"x": 1}));

        // The signature and thought were recorded for the follow-up turn
        let meta = toolmeta::global().get(&call.id).unwrap();
        assert_eq!(meta.signature.as_deref(), Some("sig-3"));
        assert_eq!(meta.thought.as_deref(), Some("weighing"));
    }

    #[test]
    fn finish_reason_prefers_tool_calls_when_one_was_emitted() {
        let mut decoder = GoogleDecoder::new();
        decoder
            .on_data(
                &json!({
                    "candidates": [{
                        "content": {"parts": [{"functionCall": {"name": "probe", "args": {}}}]},
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
            .unwrap();

        let terminal = decoder.finish().unwrap();
        assert_eq!(
            terminal,
            vec![ChatEvent::Completed(Completion {
                response_id: None,
                finish: Some(FinishReason::ToolCalls),
            })]
        );
    }
}
