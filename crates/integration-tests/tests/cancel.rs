mod harness;

use futures_util::StreamExt;
use harness::config::ConfigBuilder;
use harness::upstream::{MockBody, MockUpstream};
use prism::PrismClient;
use prism_llm::types::{ChatEvent, ChatMessage, ChatRequest};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn cancellation_flushes_pending_reasoning_and_ends() {
    // The mock sends an open thinking block and then hangs forever
    let frames = vec![
        json!({"type":"message_start","message":{"id":"msg_1"}}).to_string(),
        json!({"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}).to_string(),
        json!({"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"still going"}}).to_string(),
    ];
    let mock = MockUpstream::start(MockBody::SseThenHang(frames)).await.unwrap();

    let config = ConfigBuilder::new()
        .with_model("claude-sonnet-4", "anthropic", &mock.base_url())
        .build();
    let client = PrismClient::new(config);

    let cancel = CancellationToken::new();
    let mut stream = client
        .chat_stream(
            "claude-sonnet-4",
            ChatRequest::new(vec![ChatMessage::user("Think for a while")]),
            cancel.clone(),
        )
        .await
        .unwrap();

    // The delta arrives, then the upstream goes silent
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first, ChatEvent::ThinkingDelta("still going".to_owned()));

    cancel.cancel();

    // The read loop exits at its suspension point, flushing the open
    // reasoning channel so the terminal state is consistent
    let mut remaining = Vec::new();
    while let Some(event) = stream.next().await {
        remaining.push(event.unwrap());
    }
    assert_eq!(remaining, vec![ChatEvent::ThinkingEnd { signature: None }]);
}
