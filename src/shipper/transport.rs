//! Delivery backends for shipped log batches.

use super::LogEntry;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Destination for a flushed batch of log entries.
///
/// Implementations must not log through the shipper that invoked them; a
/// failed delivery is reported by returning `Err`, and the shipper handles
/// requeueing.
#[async_trait]
pub trait LogTransport: Send + Sync {
    async fn deliver(&self, correlation_id: &str, entries: &[LogEntry]) -> Result<()>;
}

/// Ships batches to the server log-collection endpoint as
/// `POST {"entries": [...]}` with an `X-Correlation-ID` header.
/// The response body is never consumed.
pub struct HttpLogTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpLogTransport {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl LogTransport for HttpLogTransport {
    async fn deliver(&self, correlation_id: &str, entries: &[LogEntry]) -> Result<()> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("X-Correlation-ID", correlation_id)
            .json(&serde_json::json!({ "entries": entries }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::runtime(format!(
                "log shipment rejected with status {}",
                response.status().as_u16()
            )))
        }
    }
}

/// Local-only sink that reports entries through `tracing`. Used as the
/// default when no collection endpoint is configured.
#[derive(Debug, Default)]
pub struct ConsoleLogTransport;

#[async_trait]
impl LogTransport for ConsoleLogTransport {
    async fn deliver(&self, correlation_id: &str, entries: &[LogEntry]) -> Result<()> {
        for entry in entries {
            tracing::debug!(
                correlation_id,
                level = ?entry.level,
                event = entry.event.as_deref().unwrap_or(""),
                "{}",
                entry.message
            );
        }
        Ok(())
    }
}

/// In-memory transport for tests, with injectable failure.
#[derive(Default)]
pub struct InMemoryLogTransport {
    batches: Mutex<Vec<(String, Vec<LogEntry>)>>,
    failing: AtomicBool,
}

impl InMemoryLogTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All successfully delivered batches, with their correlation tags.
    pub fn batches(&self) -> Vec<(String, Vec<LogEntry>)> {
        self.batches.lock().unwrap().clone()
    }

    /// All delivered entries flattened in delivery order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, b)| b.iter().cloned())
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogTransport for InMemoryLogTransport {
    async fn deliver(&self, correlation_id: &str, entries: &[LogEntry]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::runtime("injected delivery failure"));
        }
        self.batches
            .lock()
            .unwrap()
            .push((correlation_id.to_string(), entries.to_vec()));
        Ok(())
    }
}
