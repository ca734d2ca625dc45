mod harness;

use harness::config::ConfigBuilder;
use harness::upstream::{MockBody, MockUpstream};
use harness::{answer_text, collect_events};
use prism::PrismClient;
use prism_llm::types::{ChatMessage, ChatRequest, Part, Role};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn response_frames(id: &str) -> Vec<String> {
    vec![
        json!({"type":"response.created","response":{"id":id}}).to_string(),
        json!({"type":"response.output_text.delta","delta":"ok"}).to_string(),
        json!({"type":"response.completed","response":{"id":id,"usage":{"input_tokens":3,"output_tokens":1}}}).to_string(),
        "[DONE]".to_owned(),
    ]
}

fn conversation_with_marker(model: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::user("first question"),
        ChatMessage {
            role: Role::Assistant,
            parts: vec![
                Part::Text {
                    text: "first answer".to_owned(),
                },
                Part::ResponseRef {
                    model: model.to_owned(),
                    response_id: "resp_1".to_owned(),
                },
            ],
        },
        ChatMessage::user("second question"),
    ]
}

#[tokio::test]
async fn marker_enables_delta_only_resend() {
    let mock = MockUpstream::start(MockBody::Sse(response_frames("resp_2"))).await.unwrap();
    let config = ConfigBuilder::new()
        .with_model("gpt-5", "openai_responses", &mock.base_url())
        .build();
    let client = PrismClient::new(config);

    let stream = client
        .chat_stream(
            "gpt-5",
            ChatRequest::new(conversation_with_marker("gpt-5")),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let events = collect_events(stream).await;
    assert_eq!(answer_text(&events), "ok");

    // Only the trailing delta went on the wire, referencing the server
    // response
    let request = &mock.requests()[0];
    assert_eq!(request["previous_response_id"], json!("resp_1"));
    let input = request["input"].as_array().unwrap();
    assert_eq!(input.len(), 1);
    assert_eq!(input[0]["content"][0]["text"], json!("second question"));
}

#[tokio::test]
async fn marker_for_other_model_sends_full_history() {
    let mock = MockUpstream::start(MockBody::Sse(response_frames("resp_2"))).await.unwrap();
    let config = ConfigBuilder::new()
        .with_model("gpt-5", "openai_responses", &mock.base_url())
        .build();
    let client = PrismClient::new(config);

    let stream = client
        .chat_stream(
            "gpt-5",
            ChatRequest::new(conversation_with_marker("o4-mini")),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    collect_events(stream).await;

    let request = &mock.requests()[0];
    assert!(request.get("previous_response_id").is_none());
    assert_eq!(request["input"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn rejected_reference_falls_back_to_full_history_once() {
    let mock = MockUpstream::start_failing(MockBody::Sse(response_frames("resp_2")), 404, 1)
        .await
        .unwrap();
    let config = ConfigBuilder::new()
        .with_model("gpt-5", "openai_responses", &mock.base_url())
        .build();
    let client = PrismClient::new(config);

    let stream = client
        .chat_stream(
            "gpt-5",
            ChatRequest::new(conversation_with_marker("gpt-5")),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let events = collect_events(stream).await;
    assert_eq!(answer_text(&events), "ok");

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);

    // First attempt was the delta send the backend rejected
    assert_eq!(requests[0]["previous_response_id"], json!("resp_1"));
    // The synchronous resend carried the full history, no continuity field
    assert!(requests[1].get("previous_response_id").is_none());
    assert_eq!(requests[1]["input"].as_array().unwrap().len(), 3);

    // The base URL is remembered: the next request never attempts a delta
    let stream = client
        .chat_stream(
            "gpt-5",
            ChatRequest::new(conversation_with_marker("gpt-5")),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    collect_events(stream).await;

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[2].get("previous_response_id").is_none());
}

#[tokio::test]
async fn explicit_user_continuity_id_forces_full_history() {
    let mock = MockUpstream::start(MockBody::Sse(response_frames("resp_2"))).await.unwrap();
    let config = ConfigBuilder::new()
        .with_model_lines(
            "gpt-5",
            "openai_responses",
            &mock.base_url(),
            "[models.\"gpt-5\".extra]\nprevious_response_id = \"resp_manual\"",
        )
        .build();
    let client = PrismClient::new(config);

    let stream = client
        .chat_stream(
            "gpt-5",
            ChatRequest::new(conversation_with_marker("gpt-5")),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    collect_events(stream).await;

    // Manual control: full history plus the user's own id, never sliced
    let request = &mock.requests()[0];
    assert_eq!(request["previous_response_id"], json!("resp_manual"));
    assert_eq!(request["input"].as_array().unwrap().len(), 3);
}
