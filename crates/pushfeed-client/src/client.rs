//! Streaming connection to the notification feed

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pushfeed_core::{ErrorEvent, EventData, EventDispatcher, Status, StatusStore, SubscriberId};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

use crate::config::EventSourceConfig;
use crate::error::{FeedClientError, Result};
use crate::streaming::{stop_requested, ReadOutcome, StreamReader};

/// Client for one streaming connection to the feed
///
/// Construction only allocates; [`connect`](Self::connect) starts a background
/// task that opens the stream and publishes decoded events to the registered
/// callbacks. An instance makes a single connection attempt. It never retries;
/// watch [`status`](Self::status) or the error callbacks and build a new client
/// to reconnect.
///
/// # Example
///
/// ```no_run
/// use pushfeed_client::{EventSourceClient, EventSourceConfig};
///
/// # async fn example() -> pushfeed_client::Result<()> {
/// let client = EventSourceClient::new(EventSourceConfig::new("http://localhost:8080/sse"))?;
/// client.on_event(|event| println!("{event}"));
/// client.on_error(|error| eprintln!("{error}"));
/// client.connect()?;
///
/// // ...
///
/// client.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct EventSourceClient {
    url: Url,
    read_timeout: Duration,
    http_client: Client,
    status: Arc<StatusStore>,
    dispatcher: Arc<EventDispatcher>,
    started: AtomicBool,
    stop_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
    done_tx: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventSourceClient {
    /// Create a client without connecting
    pub fn new(config: EventSourceConfig) -> Result<Self> {
        let url = Url::parse(&config.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FeedClientError::UnsupportedScheme(url.scheme().to_string()));
        }

        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .default_headers(default_headers(&config)?)
            .build()?;

        let (stop_tx, _) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);

        Ok(Self {
            url,
            read_timeout: config.read_timeout(),
            http_client,
            status: Arc::new(StatusStore::new()),
            dispatcher: Arc::new(EventDispatcher::new()),
            started: AtomicBool::new(false),
            stop_tx,
            done_rx,
            done_tx: Mutex::new(Some(done_tx)),
            task: Mutex::new(None),
        })
    }

    /// Create a client and start connecting right away
    ///
    /// Callbacks registered afterwards miss anything published before they
    /// were added; use [`new`](Self::new) + [`connect`](Self::connect) when
    /// that matters.
    pub fn spawn(config: EventSourceConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.connect()?;
        Ok(client)
    }

    /// Streaming endpoint URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current connection status
    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Register a callback for decoded events
    pub fn on_event<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        self.dispatcher.on_event(handler)
    }

    /// Register a callback for connect, read and decode errors
    pub fn on_error<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        self.dispatcher.on_error(handler)
    }

    /// Remove a callback registered with `on_event` or `on_error`
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Start the connection attempt in the background
    ///
    /// Sets the status to `Connecting` before returning. Fails with
    /// [`FeedClientError::AlreadyStarted`] on a second call or after
    /// [`disconnect`](Self::disconnect).
    pub fn connect(&self) -> Result<()> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| FeedClientError::NoRuntime)?;

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(FeedClientError::AlreadyStarted);
        }

        let done_tx = self.done_tx.lock().take();
        self.status.set(Status::Connecting);

        let connection = Connection {
            url: self.url.clone(),
            read_timeout: self.read_timeout,
            http_client: self.http_client.clone(),
            status: self.status.clone(),
            dispatcher: self.dispatcher.clone(),
        };
        let status = self.status.clone();
        let mut stop_rx = self.stop_tx.subscribe();
        let span = info_span!("event_source", url = %self.url);

        let handle = runtime.spawn(
            async move {
                connection.run(&mut stop_rx).await;
                status.set(Status::Disconnected);
                if let Some(done_tx) = done_tx {
                    done_tx.send_replace(true);
                }
            }
            .instrument(span),
        );
        *self.task.lock() = Some(handle);

        Ok(())
    }

    /// Resolve once the background task has finished, for any reason
    ///
    /// Returns immediately if the client was never started.
    pub async fn closed(&self) {
        if !self.started.load(Ordering::SeqCst) {
            return;
        }
        let mut done_rx = self.done_rx.clone();
        // An error means the task is gone, which is also "closed"
        let _ = done_rx.wait_for(|done| *done).await;
    }

    /// Stop reading and release the connection
    ///
    /// Waits for the read loop to exit before returning, so no callback fires
    /// after this resolves. Safe to call from any task, any number of times.
    pub async fn disconnect(&self) {
        debug!(url = %self.url, "Disconnecting");

        self.started.store(true, Ordering::SeqCst);
        self.stop_tx.send_replace(true);

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(url = %self.url, error = %e, "Read loop ended abnormally");
            }
        }

        if let Some(done_tx) = self.done_tx.lock().take() {
            done_tx.send_replace(true);
        }

        let previous = self.status.replace(Status::Disconnected);
        info!(url = %self.url, from = %previous, "Disconnected");
    }
}

impl Drop for EventSourceClient {
    fn drop(&mut self) {
        // Let a detached read loop wind down on its own
        self.stop_tx.send_replace(true);
    }
}

impl std::fmt::Debug for EventSourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSourceClient")
            .field("url", &self.url.as_str())
            .field("read_timeout", &self.read_timeout)
            .field("status", &self.status.get())
            .finish()
    }
}

fn default_headers(config: &EventSourceConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(token) = &config.bearer_token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| FeedClientError::InvalidHeader(format!("Invalid auth token: {}", e)))?;
        headers.insert(AUTHORIZATION, value);
    }

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FeedClientError::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FeedClientError::InvalidHeader(format!("{}: {}", name, e)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// State owned by the background task
struct Connection {
    url: Url,
    read_timeout: Duration,
    http_client: Client,
    status: Arc<StatusStore>,
    dispatcher: Arc<EventDispatcher>,
}

impl Connection {
    async fn run(self, stop: &mut watch::Receiver<bool>) {
        info!("Connecting");

        let request = self
            .http_client
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .send();

        let response = tokio::select! {
            biased;
            _ = stop_requested(stop) => {
                debug!("Connect cancelled");
                return;
            }
            response = request => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => return self.fail(ErrorEvent::connect(e.to_string())),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = tokio::select! {
                biased;
                _ = stop_requested(stop) => {
                    debug!(status, "Connect cancelled while reading error body");
                    return;
                }
                body = tokio::time::timeout(self.read_timeout, response.text()) => body,
            };
            let message = body.ok().and_then(|body| body.ok()).unwrap_or_default();
            return self.fail(ErrorEvent::connect(format!(
                "Server returned {}: {}",
                status, message
            )));
        }

        self.status.set(Status::Connected);
        info!("Connected");

        let mut reader = StreamReader::new(Box::pin(response.bytes_stream()), self.read_timeout);
        match reader.run(&self.status, &self.dispatcher, stop).await {
            ReadOutcome::Cancelled => debug!("Read loop cancelled"),
            ReadOutcome::Failed(err) => self.fail(err),
        }
    }

    /// Mark the connection down, then tell subscribers why
    fn fail(&self, err: ErrorEvent) {
        let previous = self.status.replace(Status::Disconnected);
        warn!(kind = %err.kind, message = %err.message, from = %previous, "Connection lost");
        self.dispatcher.publish_error(&err);
    }
}
