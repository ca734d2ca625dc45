use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures_util::StreamExt;
use prism_config::Config;
use prism_llm::provider::provider_for;
use prism_llm::types::{ChatEvent, ChatMessage, ChatRequest};
use prism_llm::{EventStream, LlmError};
use tokio_util::sync::CancellationToken;

/// The request dispatcher
///
/// Selects an adapter by the model's configured protocol, applies the
/// per-model throttle, runs the HTTP attempt through the retry executor,
/// and hands back the canonical event stream.
pub struct PrismClient {
    config: Config,
    http: reqwest::Client,
    /// Last completion time per provider-facing path
    ///
    /// The throttle is a cooperative wait blocking only the next send on
    /// the same path; requests to different models never serialize with
    /// each other.
    last_completed: Arc<DashMap<String, Instant>>,
}

impl PrismClient {
    /// Create a client over a loaded configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            last_completed: Arc::new(DashMap::new()),
        }
    }

    /// The configuration this client dispatches against
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Send a chat request to a configured model and stream canonical
    /// events back
    pub async fn chat_stream(
        &self,
        model_id: &str,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream, LlmError> {
        let model = self
            .config
            .model(model_id)
            .ok_or_else(|| LlmError::Config(format!("unknown model: {model_id}")))?;

        let provider = provider_for(model_id, model, self.http.clone(), &self.config.retry)?;

        self.wait_for_slot(model_id, model.delay_ms, &cancel).await;

        tracing::debug!(model = model_id, provider = provider.name(), "dispatching chat request");
        let stream = provider.stream(&request, cancel).await?;

        // Stamp the path's completion time when its stream ends
        let last_completed = Arc::clone(&self.last_completed);
        let path_key = model_id.to_owned();
        let stamped = stream.inspect(move |event| {
            if matches!(event, Ok(ChatEvent::Completed(_)) | Err(_)) {
                last_completed.insert(path_key.clone(), Instant::now());
            }
        });

        Ok(Box::pin(stamped))
    }

    /// Send once and return the aggregated answer text
    ///
    /// The streaming primitive underneath is the same one chat uses;
    /// reasoning and tool calls are ignored.
    pub async fn send_once(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        messages: Vec<ChatMessage>,
    ) -> Result<String, LlmError> {
        let mut all = Vec::new();
        if let Some(system) = system_prompt {
            all.push(ChatMessage::system(system));
        }
        all.extend(messages);

        let mut stream = self
            .chat_stream(model_id, ChatRequest::new(all), CancellationToken::new())
            .await?;

        let mut text = String::new();
        while let Some(event) = stream.next().await {
            if let ChatEvent::TextDelta(delta) = event? {
                text.push_str(&delta);
            }
        }
        Ok(text)
    }

    /// Cooperative inter-request throttle keyed by last-completed time
    async fn wait_for_slot(&self, path_key: &str, delay_ms: u64, cancel: &CancellationToken) {
        if delay_ms == 0 {
            return;
        }

        let delay = Duration::from_millis(delay_ms);
        let elapsed = self.last_completed.get(path_key).map(|entry| entry.elapsed());

        if let Some(elapsed) = elapsed
            && elapsed < delay
        {
            let remaining = delay - elapsed;
            tracing::debug!(path = path_key, ?remaining, "throttling next send");
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(remaining) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_delay(delay_ms: u64) -> Config {
        toml::from_str::<Config>(&format!(
            r#"
            [models.m]
            protocol = "ollama"
            delay_ms = {delay_ms}
            "#
        ))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_waits_only_after_a_completion() {
        let client = PrismClient::new(config_with_delay(500));

        // No completion recorded yet: returns immediately
        let start = tokio::time::Instant::now();
        client.wait_for_slot("m", 500, &CancellationToken::new()).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        client.last_completed.insert("m".to_owned(), Instant::now());
        let start = tokio::time::Instant::now();
        client.wait_for_slot("m", 500, &CancellationToken::new()).await;
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn unknown_model_is_a_config_error() {
        let client = PrismClient::new(config_with_delay(0));
        let result = client
            .chat_stream("missing", ChatRequest::new(vec![]), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(LlmError::Config(_))));
    }
}
