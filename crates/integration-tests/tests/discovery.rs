mod harness;

use harness::upstream::{MockBody, MockUpstream};
use prism_config::{ModelConfig, RetryConfig};
use prism_llm::RetryExecutor;
use prism_llm::discovery::list_models;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn model_config(protocol: &str, base_url: &str) -> ModelConfig {
    serde_json::from_value(json!({
        "protocol": protocol,
        "base_url": base_url,
        "api_key": "test-key",
    }))
    .unwrap()
}

#[tokio::test]
async fn ollama_tags_list_models() {
    let document = json!({
        "models": [
            {"name": "llama3.2:latest"},
            {"name": "qwen3:8b"}
        ]
    })
    .to_string();
    let mock = MockUpstream::start(MockBody::Json(document)).await.unwrap();

    let models = list_models(
        &reqwest::Client::new(),
        &model_config("ollama", &mock.base_url()),
        &RetryExecutor::new(&RetryConfig::default()),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["llama3.2:latest", "qwen3:8b"]);
}

#[tokio::test]
async fn google_pagination_stops_at_the_page_cap() {
    // Every page advertises a next page; listing must still terminate
    let document = json!({
        "models": [
            {"name": "models/gemini-2.5-flash", "displayName": "Gemini 2.5 Flash", "inputTokenLimit": 1_048_576}
        ],
        "nextPageToken": "again"
    })
    .to_string();
    let mock = MockUpstream::start(MockBody::Json(document)).await.unwrap();

    let models = list_models(
        &reqwest::Client::new(),
        &model_config("google", &mock.base_url()),
        &RetryExecutor::new(&RetryConfig::default()),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(mock.hits(), 10);
    assert_eq!(models.len(), 10);
    // Resource prefixes are stripped and metadata carried through
    assert_eq!(models[0].id, "gemini-2.5-flash");
    assert_eq!(models[0].display_name.as_deref(), Some("Gemini 2.5 Flash"));
    assert_eq!(models[0].context_length, Some(1_048_576));
}
