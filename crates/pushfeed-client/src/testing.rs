//! Test utilities for pushfeed-client
//!
//! Provides an in-process feed endpoint for integration tests.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::Result;

/// Path the scripted feed is served on
pub const FEED_PATH: &str = "/sse";

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` on an ephemeral localhost port
    pub async fn start(router: Router) -> Result<Self> {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Serve a feed endpoint that always answers with `status` and `body`
    pub async fn rejecting(status: StatusCode, body: &'static str) -> Result<Self> {
        let router = Router::new().route(FEED_PATH, get(move || async move { (status, body) }));
        Self::start(router).await
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of the feed endpoint
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url(), FEED_PATH)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal if not already done
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Abort the task if still running
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

struct FeedState {
    frames: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    connections: AtomicUsize,
}

/// Scripted SSE endpoint
///
/// The first request to [`FEED_PATH`] gets a streaming response whose body is
/// whatever the test pushes with the `send_*` methods. Later requests get
/// `409 Conflict`.
pub struct FeedServer {
    server: TestServer,
    frames: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    state: Arc<FeedState>,
}

impl FeedServer {
    pub async fn start() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(FeedState {
            frames: Mutex::new(Some(rx)),
            connections: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route(FEED_PATH, get(stream_feed))
            .with_state(state.clone());
        let server = TestServer::start(router).await?;

        Ok(Self {
            server,
            frames: Mutex::new(Some(tx)),
            state,
        })
    }

    /// URL of the feed endpoint
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Number of requests the endpoint has received
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Push raw bytes to the open stream
    pub fn send_raw(&self, bytes: impl Into<Bytes>) {
        if let Some(tx) = self.frames.lock().as_ref() {
            let _ = tx.send(bytes.into());
        }
    }

    /// Push a bare newline keep-alive
    pub fn send_keep_alive(&self) {
        self.send_raw(Bytes::from_static(b"\n"));
    }

    /// Push one SSE record carrying `payload` wrapped the way the feed wraps it
    pub fn send_notification(&self, payload: &serde_json::Value) {
        self.send_raw(notification_frame(payload));
    }

    /// End the response body, as a server-side close
    pub fn close_stream(&self) {
        self.frames.lock().take();
    }
}

/// Encode `payload` as a complete SSE record
///
/// The payload is string-encoded inside an envelope, matching the upstream feed.
pub fn notification_frame(payload: &serde_json::Value) -> Bytes {
    let envelope = serde_json::json!({
        "id": "test-id",
        "clientId": "test-client",
        "timestamp": 1_591_996_755_043i64,
        "encoding": "json",
        "channel": "test_splits",
        "data": payload.to_string(),
    });
    Bytes::from(format!("event: message\ndata: {}\n\n", envelope))
}

async fn stream_feed(State(state): State<Arc<FeedState>>) -> Response {
    state.connections.fetch_add(1, Ordering::SeqCst);

    let Some(rx) = state.frames.lock().take() else {
        return (StatusCode::CONFLICT, "feed already consumed").into_response();
    };

    let body = Body::from_stream(UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>));
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

/// Wait for a condition with timeout
pub async fn wait_for<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    condition()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_frame_is_one_record() {
        let frame = notification_frame(&serde_json::json!({"type": "CONTROL"}));
        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("event: message\ndata: {"));
        assert!(text.ends_with("}\n\n"));
        assert_eq!(text.matches("\n\n").count(), 1);
    }
}
