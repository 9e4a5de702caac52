//! Destinations for serialized speak events.
//!
//! The tailer hands every finished event to an [`EventSink`] as its JSON
//! wire string. Sinks are fire-and-forget: delivery problems are logged by
//! the sink and never reach the tailer.
//!
//! - [`StdoutSink`]: one event per line on stdout, for a parent process
//!   reading our pipe
//! - [`ChannelSink`]: forwards into a tokio channel, for embedding and tests
//! - [`HttpSink`]: posts to a `chatter-server` hub
//!
//! Any `Fn(&str) + Send + Sync` closure is a sink as well.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// HTTP request timeout for [`HttpSink`].
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Receives serialized speak events.
///
/// `broadcast` must not block for long and must not panic; it is called
/// from the tailer's processing tasks.
pub trait EventSink: Send + Sync {
    /// Delivers one serialized event.
    fn broadcast(&self, message: &str);
}

impl<F> EventSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn broadcast(&self, message: &str) {
        self(message);
    }
}

/// Writes each event as a line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn broadcast(&self, message: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{message}").and_then(|()| stdout.flush()) {
            warn!(error = %e, "Failed to write event to stdout");
        }
    }
}

/// Forwards events into an unbounded tokio channel.
///
/// Once the receiver is dropped the sink silently discards events.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Creates a sink together with the receiving end of its channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn broadcast(&self, message: &str) {
        if self.tx.send(message.to_string()).is_err() {
            debug!("Event receiver closed, dropping event");
        }
    }
}

/// Posts events to a `chatter-server` hub at `<server_url>/speak`.
///
/// Events are queued and posted in order by a background task, so
/// [`broadcast`](EventSink::broadcast) returns immediately. Must be created
/// inside a tokio runtime. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct HttpSink {
    inner: Arc<HttpSinkInner>,
}

#[derive(Debug)]
struct HttpSinkInner {
    endpoint: String,
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HttpSink {
    /// Creates the sink and spawns its delivery task.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(server_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let endpoint = format!("{}/speak", server_url.trim_end_matches('/'));

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(deliver(client, endpoint.clone(), rx));

        Ok(Self {
            inner: Arc::new(HttpSinkInner {
                endpoint,
                tx: Mutex::new(Some(tx)),
                task: Mutex::new(Some(task)),
            }),
        })
    }

    /// Full URL events are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Stops accepting events and waits up to `timeout` for the queue to drain.
    ///
    /// Returns `false` if the timeout elapsed first. Later calls return
    /// `true` immediately.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        if let Ok(mut tx) = self.inner.tx.lock() {
            tx.take();
        }
        let task = self.inner.task.lock().ok().and_then(|mut task| task.take());
        let Some(task) = task else {
            return true;
        };

        match tokio::time::timeout(timeout, task).await {
            Ok(_) => true,
            Err(_) => {
                warn!(endpoint = %self.inner.endpoint, "Timed out draining queued events");
                false
            }
        }
    }
}

impl EventSink for HttpSink {
    fn broadcast(&self, message: &str) {
        let Ok(tx) = self.inner.tx.lock() else {
            return;
        };
        let queued = tx
            .as_ref()
            .is_some_and(|tx| tx.send(message.to_string()).is_ok());
        if !queued {
            debug!("HTTP sink shut down, dropping event");
        }
    }
}

async fn deliver(client: Client, endpoint: String, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(body) = rx.recv().await {
        let result = client
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(status = %response.status(), "Event delivered");
            }
            Ok(response) => {
                warn!(
                    endpoint = %endpoint,
                    status = %response.status(),
                    "Server rejected event"
                );
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Failed to deliver event");
            }
        }
    }
}
