mod harness;

use harness::config::ConfigBuilder;
use harness::upstream::{MockBody, MockUpstream};
use harness::{answer_text, collect_events, thinking_text};
use prism::PrismClient;
use prism_llm::types::{ChatEvent, ChatMessage, ChatRequest, ToolSpec};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn thought_parts_then_function_call() {
    let frames = vec![
        json!({"candidates":[{"content":{"role":"model","parts":[{"text":"inspecting request","thought":true}]}}]}).to_string(),
        json!({"candidates":[{"content":{"role":"model","parts":[{"functionCall":{"name":"get_weather","args":{"city":"Oslo"}},"thoughtSignature":"gsig-1"}]}}]}).to_string(),
        json!({"candidates":[{"content":{"role":"model","parts":[]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":7,"candidatesTokenCount":15,"totalTokenCount":22}}).to_string(),
    ];

    let mock = MockUpstream::start(MockBody::Sse(frames)).await.unwrap();
    let config = ConfigBuilder::new()
        .with_model("gemini-2.5-flash", "google", &mock.base_url())
        .build();
    let client = PrismClient::new(config);

    let stream = client
        .chat_stream(
            "gemini-2.5-flash",
            ChatRequest {
                messages: vec![ChatMessage::user("Weather in Oslo?")],
                tools: vec![ToolSpec {
                    name: "get_weather".to_owned(),
                    description: Some("Current weather".to_owned()),
                    parameters: json!({
                        "type": "object",
                        "properties": {"city": {"type": ["string", "null"]}}
                    }),
                }],
                tool_choice: None,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let events = collect_events(stream).await;

    assert_eq!(thinking_text(&events), "inspecting request");

    let call = events
        .iter()
        .find_map(|e| match e {
            ChatEvent::ToolCall(call) => Some(call),
            _ => None,
        })
        .expect("a tool call");
    assert_eq!(call.name, "get_weather");
    assert_eq!(call.args, json!({"city": "Oslo"}));
    // Gemini assigns no id; one was synthesized
    assert!(call.id.starts_with("call_"));

    // The continuation signature was cached for the follow-up turn
    let meta = prism_llm::toolmeta::global().get(&call.id).expect("cached call meta");
    assert_eq!(meta.signature.as_deref(), Some("gsig-1"));
    assert_eq!(meta.thought.as_deref(), Some("inspecting request"));

    // The wire request used the sanitized schema dialect
    let request = &mock.requests()[0];
    let declared = &request["tools"][0]["functionDeclarations"][0]["parameters"];
    assert_eq!(
        declared["properties"]["city"],
        json!({"type": "STRING", "nullable": true})
    );
}

#[tokio::test]
async fn plain_text_stream_decodes() {
    let frames = vec![
        json!({"candidates":[{"content":{"role":"model","parts":[{"text":"Sunny"}]}}]}).to_string(),
        json!({"candidates":[{"content":{"role":"model","parts":[{"text":" and mild"}]},"finishReason":"STOP"}]}).to_string(),
    ];

    let mock = MockUpstream::start(MockBody::Sse(frames)).await.unwrap();
    let config = ConfigBuilder::new()
        .with_model("gemini-2.5-flash", "google", &mock.base_url())
        .build();
    let client = PrismClient::new(config);

    let stream = client
        .chat_stream(
            "gemini-2.5-flash",
            ChatRequest::new(vec![ChatMessage::user("Weather?")]),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let events = collect_events(stream).await;

    assert_eq!(answer_text(&events), "Sunny and mild");
}
