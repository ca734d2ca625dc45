//! Shared test harness: mock upstream servers and config builders

pub mod config;
pub mod upstream;

use futures_util::StreamExt;
use prism_llm::EventStream;
use prism_llm::types::ChatEvent;

/// Drain a stream, panicking on any error
#[allow(dead_code)]
pub async fn collect_events(mut stream: EventStream) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.expect("stream event"));
    }
    events
}

/// Text deltas of a collected event sequence, concatenated
#[allow(dead_code)]
pub fn answer_text(events: &[ChatEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::TextDelta(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

/// Thinking deltas of a collected event sequence, concatenated
#[allow(dead_code)]
pub fn thinking_text(events: &[ChatEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::ThinkingDelta(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}
