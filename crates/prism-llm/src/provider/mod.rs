//! Provider trait and implementations for each wire protocol

pub mod anthropic;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod responses;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use prism_config::{ModelConfig, ProtocolKind, RetryConfig};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::convert::StreamDecoder;
use crate::decode::JsonLineFramer;
use crate::error::LlmError;
use crate::retry::RetryExecutor;
use crate::types::{ChatEvent, ChatRequest};

/// Stream of canonical events from one request
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ChatEvent, LlmError>> + Send>>;

/// Trait implemented by each protocol backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Protocol name for logging
    fn name(&self) -> &'static str;

    /// Send the request and stream back canonical events
    ///
    /// Cancelling the token makes the stream flush its pending reasoning
    /// state and end at the next read.
    async fn stream(&self, request: &ChatRequest, cancel: CancellationToken) -> Result<EventStream, LlmError>;
}

/// Construct the provider for a model's configured protocol
pub fn provider_for(
    model_id: &str,
    config: &ModelConfig,
    client: Client,
    retry: &RetryConfig,
) -> Result<Box<dyn ChatProvider>, LlmError> {
    let retry = RetryExecutor::new(retry);
    Ok(match config.protocol {
        ProtocolKind::OpenaiChat => Box::new(openai::OpenAiChatProvider::new(model_id, config, client, retry)?),
        ProtocolKind::OpenaiResponses => Box::new(responses::ResponsesProvider::new(model_id, config, client, retry)?),
        ProtocolKind::Anthropic => Box::new(anthropic::AnthropicProvider::new(model_id, config, client, retry)?),
        ProtocolKind::Google => Box::new(google::GoogleProvider::new(model_id, config, client, retry)?),
        ProtocolKind::Ollama => Box::new(ollama::OllamaProvider::new(model_id, config, client, retry)),
    })
}

/// Send a request through the retry executor, mapping failures to the
/// error taxonomy with the response text and URL attached
pub(crate) async fn send_with_retry<F>(
    retry: &RetryExecutor,
    cancel: &CancellationToken,
    url: &str,
    build: F,
) -> Result<reqwest::Response, LlmError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    retry
        .execute(cancel, || {
            let builder = build();
            let url = url.to_owned();
            async move {
                let response = builder.send().await.map_err(|e| LlmError::Transport(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    tracing::warn!(%url, status = status.as_u16(), "upstream returned error");
                    return Err(LlmError::Status {
                        status: status.as_u16(),
                        body,
                        url,
                    });
                }
                Ok(response)
            }
        })
        .await
}

/// Apply per-model custom headers to a request
///
/// Best-effort: entries that are not valid header names or values are
/// skipped with a warning rather than failing the request.
pub(crate) fn apply_headers(
    mut builder: reqwest::RequestBuilder,
    headers: &indexmap::IndexMap<String, String>,
) -> reqwest::RequestBuilder {
    use http::header::{HeaderName, HeaderValue};

    for (name, value) in headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => builder = builder.header(name, value),
            _ => tracing::warn!(header = %name, "skipping invalid custom header"),
        }
    }
    builder
}

/// Drive an SSE response body through a decoder
///
/// One chunk is processed fully, in arrival order, before the next is
/// read; cancellation is checked at the single await point and flushes the
/// decoder's pending reasoning state. Transport errors mid-stream end the
/// stream; malformed payloads are the decoder's business and never abort
/// it.
pub(crate) fn decode_sse<D>(response: reqwest::Response, mut decoder: D, cancel: CancellationToken) -> EventStream
where
    D: StreamDecoder + 'static,
{
    use eventsource_stream::Eventsource;

    let stream = async_stream::stream! {
        let mut events = response.bytes_stream().eventsource();

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    for event in decoder.cancel() {
                        yield Ok(event);
                    }
                    return;
                }
                next = events.next() => match next {
                    Some(Ok(event)) => {
                        let data = event.data.trim().to_owned();
                        if data.is_empty() {
                            continue;
                        }
                        match decoder.on_data(&data) {
                            Ok(out) => {
                                for event in out {
                                    yield Ok(event);
                                }
                            }
                            Err(error) => {
                                yield Err(error);
                                return;
                            }
                        }
                    }
                    Some(Err(error)) => {
                        yield Err(LlmError::Streaming(error.to_string()));
                        return;
                    }
                    None => {
                        match decoder.finish() {
                            Ok(out) => {
                                for event in out {
                                    yield Ok(event);
                                }
                            }
                            Err(error) => yield Err(error),
                        }
                        return;
                    }
                }
            }
        }
    };

    Box::pin(stream)
}

/// Drive a JSON-lines response body through a decoder (Ollama framing)
pub(crate) fn decode_json_lines<D>(response: reqwest::Response, mut decoder: D, cancel: CancellationToken) -> EventStream
where
    D: StreamDecoder + 'static,
{
    let stream = async_stream::stream! {
        let mut framer = JsonLineFramer::new();
        let mut bytes = response.bytes_stream();

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    for event in decoder.cancel() {
                        yield Ok(event);
                    }
                    return;
                }
                next = bytes.next() => match next {
                    Some(Ok(chunk)) => {
                        for line in framer.push(&chunk) {
                            match decoder.on_data(&line) {
                                Ok(out) => {
                                    for event in out {
                                        yield Ok(event);
                                    }
                                }
                                Err(error) => {
                                    yield Err(error);
                                    return;
                                }
                            }
                        }
                    }
                    Some(Err(error)) => {
                        yield Err(LlmError::Streaming(error.to_string()));
                        return;
                    }
                    None => {
                        if let Some(line) = framer.finish() {
                            match decoder.on_data(&line) {
                                Ok(out) => {
                                    for event in out {
                                        yield Ok(event);
                                    }
                                }
                                Err(error) => {
                                    yield Err(error);
                                    return;
                                }
                            }
                        }
                        match decoder.finish() {
                            Ok(out) => {
                                for event in out {
                                    yield Ok(event);
                                }
                            }
                            Err(error) => yield Err(error),
                        }
                        return;
                    }
                }
            }
        }
    };

    Box::pin(stream)
}
