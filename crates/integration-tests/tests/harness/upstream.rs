//! Mock provider backend for integration tests
//!
//! Serves scripted SSE or JSON-lines bodies on every route, optionally
//! failing the first N requests, and captures request bodies so tests can
//! assert what actually went on the wire.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

/// How the mock serves its scripted payloads
#[derive(Debug, Clone)]
pub enum MockBody {
    /// SSE frames; each entry becomes one `data:` record
    Sse(Vec<String>),
    /// One JSON object per line (Ollama framing)
    JsonLines(Vec<String>),
    /// A single JSON document (model discovery endpoints)
    Json(String),
    /// SSE frames followed by a body that never ends, for cancellation
    /// tests
    SseThenHang(Vec<String>),
}

struct MockState {
    body: MockBody,
    fail_status: u16,
    fail_remaining: AtomicU32,
    hits: AtomicU32,
    requests: Mutex<Vec<serde_json::Value>>,
}

/// Mock upstream provider bound to an ephemeral local port
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockUpstream {
    /// Start a mock that always serves the scripted body
    pub async fn start(body: MockBody) -> anyhow::Result<Self> {
        Self::start_failing(body, 0, 0).await
    }

    /// Start a mock that fails the first `fail_count` requests with
    /// `fail_status` before serving the scripted body
    pub async fn start_failing(body: MockBody, fail_status: u16, fail_count: u32) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            body,
            fail_status,
            fail_remaining: AtomicU32::new(fail_count),
            hits: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .fallback(axum::routing::any(handle))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as a provider
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests received, including failed ones
    pub fn hits(&self) -> u32 {
        self.state.hits.load(Ordering::Relaxed)
    }

    /// JSON bodies of every captured request, in order
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.state.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(State(state): State<Arc<MockState>>, body: Bytes) -> Response {
    state.hits.fetch_add(1, Ordering::Relaxed);

    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&body) {
        state.requests.lock().expect("requests lock").push(json);
    }

    if state.fail_remaining.load(Ordering::Relaxed) > 0 {
        state.fail_remaining.fetch_sub(1, Ordering::Relaxed);
        return (
            StatusCode::from_u16(state.fail_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "scripted failure",
        )
            .into_response();
    }

    match &state.body {
        MockBody::Sse(frames) => {
            let payload: String = frames.iter().map(|f| format!("data: {f}\n\n")).collect();
            ([(header::CONTENT_TYPE, "text/event-stream")], payload).into_response()
        }
        MockBody::JsonLines(lines) => {
            let mut payload = lines.join("\n");
            payload.push('\n');
            ([(header::CONTENT_TYPE, "application/x-ndjson")], payload).into_response()
        }
        MockBody::Json(document) => {
            ([(header::CONTENT_TYPE, "application/json")], document.clone()).into_response()
        }
        MockBody::SseThenHang(frames) => {
            let head: String = frames.iter().map(|f| format!("data: {f}\n\n")).collect();
            let stream = async_stream::stream! {
                yield Ok::<Bytes, std::convert::Infallible>(Bytes::from(head));
                std::future::pending::<()>().await;
            };
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                Body::from_stream(stream),
            )
                .into_response()
        }
    }
}
