//! Push-stream client for server-sent job-progress updates.
//!
//! [`PushStream`] maintains at most one live connection. Malformed message
//! payloads are logged and dropped, never raised; a bad frame must not
//! kill the connection. Connection failures flip `connected` off and invoke
//! the caller's error callback once; reconnecting is the caller's decision.

mod decode;

pub use decode::SseFrames;

use crate::shipper::LogShipper;
use futures::StreamExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Invoked with each successfully parsed message payload.
pub type MessageCallback = Arc<dyn Fn(Value) + Send + Sync>;
/// Invoked once when the connection fails or ends.
pub type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Default)]
struct StreamState {
    connected: AtomicBool,
    last_message: Mutex<Option<Value>>,
}

/// At-most-one live subscription to a server-push channel.
pub struct PushStream {
    http: reqwest::Client,
    shipper: Option<Arc<LogShipper>>,
    state: Arc<StreamState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PushStream {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            shipper: None,
            state: Arc::new(StreamState::default()),
            task: Mutex::new(None),
        }
    }

    /// Route stream lifecycle events through a shipper.
    pub fn with_shipper(mut self, shipper: Arc<LogShipper>) -> Self {
        self.shipper = Some(shipper);
        self
    }

    /// Open a subscription, closing any existing connection first.
    pub fn subscribe(&self, url: &str, on_message: MessageCallback, on_error: ErrorCallback) {
        self.close();
        let handle = tokio::spawn(run_connection(
            self.http.clone(),
            url.to_string(),
            self.state.clone(),
            self.shipper.clone(),
            on_message,
            on_error,
        ));
        *self.task.lock().unwrap() = Some(handle);
    }

    pub fn connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    /// The most recently parsed message, if any has arrived.
    pub fn last_message(&self) -> Option<Value> {
        self.state.last_message.lock().unwrap().clone()
    }

    /// Close the connection. Idempotent; safe from any state, including
    /// before any message has arrived.
    pub fn close(&self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
        self.state.connected.store(false, Ordering::SeqCst);
    }
}

impl Default for PushStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PushStream {
    // Teardown always closes, error path or not.
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection(
    http: reqwest::Client,
    url: String,
    state: Arc<StreamState>,
    shipper: Option<Arc<LogShipper>>,
    on_message: MessageCallback,
    on_error: ErrorCallback,
) {
    let fail = |message: String| {
        state.connected.store(false, Ordering::SeqCst);
        if let Some(shipper) = &shipper {
            shipper.stream_error(&message);
        }
        on_error(message);
    };

    let response = match http
        .get(&url)
        .header("Accept", "text/event-stream")
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            fail(format!(
                "push stream rejected with status {}",
                response.status().as_u16()
            ));
            return;
        }
        Err(err) => {
            fail(format!("push stream connection failed: {err}"));
            return;
        }
    };

    state.connected.store(true, Ordering::SeqCst);
    if let Some(shipper) = &shipper {
        shipper.stream_connect(&url);
    }

    let mut frames = SseFrames::new();
    let mut bytes = response.bytes_stream();
    while let Some(chunk) = bytes.next().await {
        match chunk {
            Ok(chunk) => {
                frames.push(&chunk);
                while let Some(payload) = frames.next_payload() {
                    handle_payload(&payload, &state, &shipper, &on_message);
                }
            }
            Err(err) => {
                fail(format!("push stream read failed: {err}"));
                return;
            }
        }
    }

    if let Some(payload) = frames.finish() {
        handle_payload(&payload, &state, &shipper, &on_message);
    }
    // Server closed the channel; the caller decides whether to resubscribe.
    fail("push stream ended".to_string());
}

fn handle_payload(
    payload: &str,
    state: &StreamState,
    shipper: &Option<Arc<LogShipper>>,
    on_message: &MessageCallback,
) {
    match serde_json::from_str::<Value>(payload) {
        Ok(message) => {
            *state.last_message.lock().unwrap() = Some(message.clone());
            if let Some(shipper) = shipper {
                shipper.stream_message("push message received");
            }
            on_message(message);
        }
        Err(err) => {
            // Malformed frame: log and drop, keep the connection.
            tracing::warn!(error = %err, "dropping unparseable push-stream frame");
            if let Some(shipper) = shipper {
                shipper.stream_error(&format!("unparseable push-stream frame: {err}"));
            }
        }
    }
}
