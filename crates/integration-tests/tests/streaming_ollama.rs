mod harness;

use harness::config::ConfigBuilder;
use harness::upstream::{MockBody, MockUpstream};
use harness::{answer_text, collect_events, thinking_text};
use prism::PrismClient;
use prism_llm::types::{ChatEvent, ChatMessage, ChatRequest, Completion, FinishReason, Usage};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn json_lines_with_inline_think_tags() {
    let lines = vec![
        json!({"message":{"role":"assistant","content":"<think>recall the"},"done":false}).to_string(),
        json!({"message":{"role":"assistant","content":" capital</think>Oslo"},"done":false}).to_string(),
        json!({"message":{"role":"assistant","content":" is the answer"},"done":false}).to_string(),
        json!({"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","prompt_eval_count":11,"eval_count":19}).to_string(),
    ];

    let mock = MockUpstream::start(MockBody::JsonLines(lines)).await.unwrap();
    let config = ConfigBuilder::new()
        .with_model("llama3.2", "ollama", &mock.base_url())
        .build();
    let client = PrismClient::new(config);

    let stream = client
        .chat_stream(
            "llama3.2",
            ChatRequest::new(vec![ChatMessage::user("Capital of Norway?")]),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let events = collect_events(stream).await;

    assert_eq!(thinking_text(&events), "recall the capital");
    assert_eq!(answer_text(&events), "Oslo is the answer");
    assert!(events.contains(&ChatEvent::ThinkingEnd { signature: None }));
    assert!(events.contains(&ChatEvent::Usage(Usage {
        prompt_tokens: 11,
        completion_tokens: 19,
    })));
    assert_eq!(
        events.last(),
        Some(&ChatEvent::Completed(Completion {
            response_id: None,
            finish: Some(FinishReason::Stop),
        }))
    );
}

#[tokio::test]
async fn structured_thinking_and_tool_call_lines() {
    let lines = vec![
        json!({"message":{"role":"assistant","content":"","thinking":"need the time"},"done":false}).to_string(),
        json!({"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"get_time","arguments":{"tz":"UTC"}}}]},"done":false}).to_string(),
        json!({"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}).to_string(),
    ];

    let mock = MockUpstream::start(MockBody::JsonLines(lines)).await.unwrap();
    let config = ConfigBuilder::new()
        .with_model("qwen3", "ollama", &mock.base_url())
        .build();
    let client = PrismClient::new(config);

    let stream = client
        .chat_stream(
            "qwen3",
            ChatRequest::new(vec![ChatMessage::user("Time?")]),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let events = collect_events(stream).await;

    assert_eq!(thinking_text(&events), "need the time");

    let call = events
        .iter()
        .find_map(|e| match e {
            ChatEvent::ToolCall(call) => Some(call),
            _ => None,
        })
        .expect("a tool call");
    assert_eq!(call.name, "get_time");
    assert_eq!(call.args, json!({"tz": "UTC"}));

    // Thinking closed before the call was emitted
    let end_pos = events
        .iter()
        .position(|e| matches!(e, ChatEvent::ThinkingEnd { .. }))
        .unwrap();
    let call_pos = events.iter().position(|e| matches!(e, ChatEvent::ToolCall(_))).unwrap();
    assert!(end_pos < call_pos);

    assert_eq!(
        events.last(),
        Some(&ChatEvent::Completed(Completion {
            response_id: None,
            finish: Some(FinishReason::ToolCalls),
        }))
    );
}
