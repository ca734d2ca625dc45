mod harness;

use harness::config::ConfigBuilder;
use harness::upstream::{MockBody, MockUpstream};
use harness::{answer_text, collect_events};
use prism::PrismClient;
use prism_llm::LlmError;
use prism_llm::types::{ChatMessage, ChatRequest};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn ok_frames() -> Vec<String> {
    vec![
        json!({"choices":[{"index":0,"delta":{"content":"recovered"}}]}).to_string(),
        json!({"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}).to_string(),
        "[DONE]".to_owned(),
    ]
}

async fn run_against(mock: &MockUpstream, max_attempts: u32) -> Result<String, LlmError> {
    let config = ConfigBuilder::new()
        .with_model("gpt-4o", "openai_chat", &mock.base_url())
        .with_retry(max_attempts, 10)
        .build();
    let client = PrismClient::new(config);

    let stream = client
        .chat_stream(
            "gpt-4o",
            ChatRequest::new(vec![ChatMessage::user("Hi")]),
            CancellationToken::new(),
        )
        .await?;
    Ok(answer_text(&collect_events(stream).await))
}

#[tokio::test]
async fn transient_500s_are_retried_to_success() {
    let mock = MockUpstream::start_failing(MockBody::Sse(ok_frames()), 500, 2)
        .await
        .unwrap();

    let text = run_against(&mock, 3).await.unwrap();
    assert_eq!(text, "recovered");
    assert_eq!(mock.hits(), 3);
}

#[tokio::test]
async fn exhausted_attempts_surface_the_last_error() {
    let mock = MockUpstream::start_failing(MockBody::Sse(ok_frames()), 500, 10)
        .await
        .unwrap();

    let error = run_against(&mock, 3).await.unwrap_err();
    assert!(matches!(error, LlmError::Status { status: 500, .. }));
    // Exactly max_attempts requests, including the first
    assert_eq!(mock.hits(), 3);
}

#[tokio::test]
async fn client_errors_are_never_retried() {
    let mock = MockUpstream::start_failing(MockBody::Sse(ok_frames()), 400, 1)
        .await
        .unwrap();

    let error = run_against(&mock, 3).await.unwrap_err();
    let LlmError::Status { status, url, .. } = error else {
        panic!("expected a status error");
    };
    assert_eq!(status, 400);
    // The failing URL is attached for diagnosability
    assert!(url.contains("/chat/completions"));
    assert_eq!(mock.hits(), 1);
}
