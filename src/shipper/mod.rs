//! Batching log shipper.
//!
//! [`LogShipper`] buffers structured [`LogEntry`] records in memory and
//! delivers them in batches through a [`LogTransport`]. Flushes are triggered
//! by buffer size, by a recurring timer, or explicitly via
//! [`LogShipper::flush_now`] (the hook for host lifecycle events; best
//! effort only, delivery is not guaranteed to complete).
//!
//! Shipping failures never reach callers: a failed batch is re-queued at the
//! buffer front, bounded by the configured cap (oldest entries dropped first
//! under sustained outage), and the failure itself is reported through
//! `tracing` only, never recursively through the shipper.
//!
//! All deliveries drain the buffer while holding a shared gate, so batches
//! are disjoint and always leave in record order, whichever trigger fired.

mod buffer;
mod transport;

pub use buffer::LogBuffer;
pub use transport::{ConsoleLogTransport, HttpLogTransport, InMemoryLogTransport, LogTransport};

use crate::correlation::CorrelationContext;
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Severity of a log entry. Entries below the shipper's configured minimum
/// are dropped before buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    #[serde(rename = "DEBUG")]
    Debug,
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "ERROR")]
    Error,
}

/// One structured log record. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        event: Option<&str>,
        context: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Self {
        Self {
            timestamp_ms: now_ms(),
            level,
            message: message.into(),
            event: event.map(str::to_string),
            context,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Shipper settings. Replaceable at runtime via [`LogShipper::configure`].
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    /// Buffered entries beyond this count trigger an immediate flush.
    pub batch_size: usize,
    /// Recurring timer flush interval.
    pub flush_interval: Duration,
    /// Hard cap on buffered entries (including re-queued failed batches).
    pub max_buffer: usize,
    /// Entries below this level are dropped before buffering.
    pub min_level: LogLevel,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            flush_interval: Duration::from_secs(10),
            max_buffer: 1000,
            min_level: LogLevel::Debug,
        }
    }
}

impl ShipperConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }
    pub fn with_flush_interval(mut self, d: Duration) -> Self {
        self.flush_interval = d;
        self
    }
    pub fn with_max_buffer(mut self, n: usize) -> Self {
        self.max_buffer = n;
        self
    }
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }
}

/// Buffering, batching, retrying shipper for client-side log records.
///
/// Must be created inside a tokio runtime (the flush timer is spawned at
/// construction). Test code constructs isolated instances with an
/// [`InMemoryLogTransport`]; a process-wide default can be installed with
/// [`set_default_shipper`].
pub struct LogShipper {
    weak: Weak<LogShipper>,
    config: ArcSwap<ShipperConfig>,
    buffer: LogBuffer,
    transport: Arc<dyn LogTransport>,
    flush_gate: Arc<tokio::sync::Mutex<()>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl LogShipper {
    pub fn new(config: ShipperConfig, transport: Arc<dyn LogTransport>) -> Arc<Self> {
        let shipper = Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            config: ArcSwap::from_pointee(config),
            buffer: LogBuffer::new(),
            transport,
            flush_gate: Arc::new(tokio::sync::Mutex::new(())),
            timer: Mutex::new(None),
        });
        shipper.restart_timer();
        shipper
    }

    /// Replace settings and restart the flush timer. The buffer is kept.
    pub fn configure(&self, config: ShipperConfig) {
        self.config.store(Arc::new(config));
        self.restart_timer();
    }

    fn restart_timer(&self) {
        let weak = self.weak.clone();
        let handle = tokio::spawn(async move {
            loop {
                let interval = match weak.upgrade() {
                    Some(shipper) => shipper.config.load().flush_interval,
                    None => break,
                };
                tokio::time::sleep(interval).await;
                match weak.upgrade() {
                    Some(shipper) => shipper.flush_now().await,
                    None => break,
                }
            }
        });
        if let Some(old) = self.timer.lock().unwrap().replace(handle) {
            old.abort();
        }
    }

    /// Buffer a log record. Never blocks and never fails. The buffer cap is
    /// enforced here too (oldest entries dropped), and a full batch is
    /// delivered in the background ahead of the new entry.
    pub fn record(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        event: Option<&str>,
        context: Option<serde_json::Map<String, serde_json::Value>>,
    ) {
        let config = self.config.load();
        if level < config.min_level {
            return;
        }
        let entry = LogEntry::new(level, message, event, context);
        if self
            .buffer
            .append(entry, config.batch_size, config.max_buffer)
        {
            self.spawn_batch_flush(config.batch_size);
        }
    }

    /// [`LogShipper::record`] with the context's correlation (and
    /// interaction) identifiers merged into the entry context.
    pub fn record_correlated(
        &self,
        ctx: &CorrelationContext,
        level: LogLevel,
        message: impl Into<String>,
        event: Option<&str>,
        context: Option<serde_json::Map<String, serde_json::Value>>,
    ) {
        let mut context = context.unwrap_or_default();
        context.insert("correlation_id".into(), ctx.correlation_id().into());
        if let Some(interaction) = ctx.interaction_id() {
            context.insert("interaction_id".into(), interaction.into());
        }
        self.record(level, message, event, Some(context));
    }

    /// Drain and deliver everything currently buffered. Safe on an empty
    /// buffer. Best-effort: a failure re-queues the batch for the next flush.
    pub async fn flush_now(&self) {
        let _serialized = self.flush_gate.lock().await;
        let batch = self.buffer.drain_all();
        Self::deliver(
            self.transport.clone(),
            self.buffer.clone(),
            self.config.load().max_buffer,
            batch,
        )
        .await;
    }

    /// Stop the flush timer and attempt one final flush. Best-effort only;
    /// there is no delivery guarantee when the process is going away.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.timer.lock().unwrap().take() {
            handle.abort();
        }
        self.flush_now().await;
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Spawn a gated flush of the oldest `batch_size` entries. The batch is
    /// drained only once the gate is held, so it cannot overtake or overlap
    /// an in-flight delivery.
    fn spawn_batch_flush(&self, batch_size: usize) {
        let transport = self.transport.clone();
        let buffer = self.buffer.clone();
        let gate = self.flush_gate.clone();
        let max_buffer = self.config.load().max_buffer;
        tokio::spawn(async move {
            let _serialized = gate.lock().await;
            let batch = buffer.drain_batch(batch_size);
            Self::deliver(transport, buffer, max_buffer, batch).await;
        });
    }

    // Callers hold the flush gate; one delivery runs at a time.
    async fn deliver(
        transport: Arc<dyn LogTransport>,
        buffer: LogBuffer,
        max_buffer: usize,
        batch: Vec<LogEntry>,
    ) {
        if batch.is_empty() {
            return;
        }
        let correlation_id = batch_correlation(&batch);
        if let Err(err) = transport.deliver(&correlation_id, &batch).await {
            tracing::warn!(
                error = %err,
                count = batch.len(),
                "log shipment failed, re-queueing batch"
            );
            buffer.requeue_front(batch, max_buffer);
        }
    }

    // Domain-event emitters: sugar over `record` with fixed event tags.

    pub fn page_view(&self, path: &str) {
        self.tagged(LogLevel::Info, format!("page view: {path}"), "page_view");
    }

    pub fn button_click(&self, name: &str) {
        self.tagged(LogLevel::Info, format!("button click: {name}"), "button_click");
    }

    pub fn form_submit(&self, form: &str) {
        self.tagged(LogLevel::Info, format!("form submit: {form}"), "form_submit");
    }

    pub fn api_request(&self, method: &str, url: &str) {
        self.tagged(LogLevel::Info, format!("{method} {url}"), "api_request");
    }

    pub fn api_response(&self, method: &str, url: &str, status: u16) {
        self.tagged(
            LogLevel::Info,
            format!("{method} {url} -> {status}"),
            "api_response",
        );
    }

    pub fn stream_connect(&self, url: &str) {
        self.tagged(LogLevel::Info, format!("stream connected: {url}"), "stream_connect");
    }

    pub fn stream_message(&self, description: &str) {
        self.tagged(LogLevel::Debug, description.to_string(), "stream_message");
    }

    pub fn stream_error(&self, message: &str) {
        self.tagged(LogLevel::Warning, message.to_string(), "stream_error");
    }

    pub fn ui_error(&self, message: &str) {
        self.tagged(LogLevel::Error, message.to_string(), "ui_error");
    }

    fn tagged(&self, level: LogLevel, message: String, event: &str) {
        self.record(level, message, Some(event), None);
    }
}

/// Correlation tag for a delivery: the first correlated entry's id, or a
/// fresh token so server-side grouping still has something to key on.
fn batch_correlation(batch: &[LogEntry]) -> String {
    batch
        .iter()
        .find_map(|e| {
            e.context
                .as_ref()?
                .get("correlation_id")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

static DEFAULT_SHIPPER: Lazy<RwLock<Option<Arc<LogShipper>>>> = Lazy::new(|| RwLock::new(None));

/// Install a process-wide default shipper (a convenience, not a requirement).
pub fn set_default_shipper(shipper: Arc<LogShipper>) {
    *DEFAULT_SHIPPER.write().unwrap() = Some(shipper);
}

/// The process-wide default shipper, if one was installed.
pub fn default_shipper() -> Option<Arc<LogShipper>> {
    DEFAULT_SHIPPER.read().unwrap().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipper_with(
        config: ShipperConfig,
    ) -> (Arc<LogShipper>, Arc<InMemoryLogTransport>) {
        let transport = InMemoryLogTransport::new();
        let shipper = LogShipper::new(config, transport.clone());
        (shipper, transport)
    }

    #[tokio::test]
    async fn test_severity_filter_drops_before_buffering() {
        let (shipper, _) = shipper_with(
            ShipperConfig::new()
                .with_min_level(LogLevel::Warning)
                .with_batch_size(100),
        );
        shipper.record(LogLevel::Debug, "dropped", None, None);
        shipper.record(LogLevel::Info, "dropped", None, None);
        shipper.record(LogLevel::Error, "kept", None, None);
        assert_eq!(shipper.pending(), 1);
    }

    #[tokio::test]
    async fn test_flush_now_delivers_and_empties() {
        let (shipper, transport) = shipper_with(ShipperConfig::new().with_batch_size(100));
        shipper.record(LogLevel::Info, "one", None, None);
        shipper.record(LogLevel::Info, "two", None, None);
        shipper.flush_now().await;
        assert_eq!(shipper.pending(), 0);
        let entries = transport.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "one");
    }

    #[tokio::test]
    async fn test_flush_now_on_empty_buffer_is_noop() {
        let (shipper, transport) = shipper_with(ShipperConfig::default());
        shipper.flush_now().await;
        assert!(transport.batches().is_empty());
    }

    #[tokio::test]
    async fn test_failed_flush_requeues_then_recovers() {
        let (shipper, transport) = shipper_with(ShipperConfig::new().with_batch_size(100));
        for i in 0..10 {
            shipper.record(LogLevel::Info, format!("e{i}"), None, None);
        }
        transport.set_failing(true);
        shipper.flush_now().await;
        assert_eq!(shipper.pending(), 10);
        assert!(transport.batches().is_empty());

        shipper.record(LogLevel::Info, "late", None, None);
        transport.set_failing(false);
        shipper.flush_now().await;

        let entries = transport.entries();
        assert_eq!(entries.len(), 11);
        assert_eq!(entries[0].message, "e0");
        assert_eq!(entries[10].message, "late");
    }

    #[tokio::test]
    async fn test_correlated_record_merges_ids() {
        let (shipper, transport) = shipper_with(ShipperConfig::new().with_batch_size(100));
        let ctx = CorrelationContext::new_interaction();
        shipper.record_correlated(&ctx, LogLevel::Info, "hello", Some("api_request"), None);
        shipper.flush_now().await;

        let entries = transport.entries();
        let context = entries[0].context.as_ref().unwrap();
        assert_eq!(
            context.get("correlation_id").unwrap().as_str().unwrap(),
            ctx.correlation_id()
        );
        assert_eq!(
            context.get("interaction_id").unwrap().as_str(),
            ctx.interaction_id()
        );
        // The batch itself is tagged with the first entry's correlation id.
        assert_eq!(transport.batches()[0].0, ctx.correlation_id());
    }

    #[tokio::test]
    async fn test_configure_keeps_buffer() {
        let (shipper, _) = shipper_with(ShipperConfig::new().with_batch_size(100));
        shipper.record(LogLevel::Info, "kept", None, None);
        shipper.configure(ShipperConfig::new().with_batch_size(5));
        assert_eq!(shipper.pending(), 1);
    }

    #[tokio::test]
    async fn test_timer_flush() {
        let (shipper, transport) = shipper_with(
            ShipperConfig::new()
                .with_batch_size(100)
                .with_flush_interval(Duration::from_millis(20)),
        );
        shipper.record(LogLevel::Info, "timed", None, None);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(transport.entries().len(), 1);
        assert_eq!(shipper.pending(), 0);
    }

    #[tokio::test]
    async fn test_size_trigger_flushes_previous_batch() {
        let (shipper, transport) = shipper_with(ShipperConfig::new().with_batch_size(10));
        for i in 0..11 {
            shipper.record(LogLevel::Info, format!("e{i}"), None, None);
        }
        // Give the spawned delivery a moment.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let entries = transport.entries();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[9].message, "e9");
        // The 11th entry is buffered, not shipped.
        assert_eq!(shipper.pending(), 1);
    }

    #[tokio::test]
    async fn test_emitters_tag_events() {
        let (shipper, transport) = shipper_with(ShipperConfig::new().with_batch_size(100));
        shipper.page_view("/characters");
        shipper.button_click("train");
        shipper.ui_error("boundary hit");
        shipper.flush_now().await;

        let events: Vec<_> = transport
            .entries()
            .iter()
            .map(|e| e.event.clone().unwrap())
            .collect();
        assert_eq!(events, ["page_view", "button_click", "ui_error"]);
        assert_eq!(transport.entries()[2].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn test_record_after_failed_flush_respects_cap() {
        let (shipper, transport) = shipper_with(
            ShipperConfig::new().with_batch_size(100).with_max_buffer(5),
        );
        for i in 0..5 {
            shipper.record(LogLevel::Info, format!("e{i}"), None, None);
        }
        transport.set_failing(true);
        shipper.flush_now().await;
        assert_eq!(shipper.pending(), 5);

        // The requeued batch fills the buffer to its cap; further records
        // evict the oldest instead of growing past it.
        for i in 0..3 {
            shipper.record(LogLevel::Info, format!("late{i}"), None, None);
            assert!(shipper.pending() <= 5);
        }

        transport.set_failing(false);
        shipper.flush_now().await;
        let msgs: Vec<_> = transport
            .entries()
            .iter()
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(msgs, ["e3", "e4", "late0", "late1", "late2"]);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_deliver_in_record_order() {
        let (shipper, transport) = shipper_with(ShipperConfig::new().with_batch_size(5));
        for i in 0..6 {
            shipper.record(LogLevel::Info, format!("e{i}"), None, None);
        }
        // The size trigger races this explicit flush for the gate; either
        // winner drains from the front, so order holds both ways.
        shipper.flush_now().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let msgs: Vec<_> = transport
            .entries()
            .iter()
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(msgs, ["e0", "e1", "e2", "e3", "e4", "e5"]);
        assert_eq!(shipper.pending(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_flushes() {
        let (shipper, transport) = shipper_with(ShipperConfig::new().with_batch_size(100));
        shipper.record(LogLevel::Info, "last words", None, None);
        shipper.shutdown().await;
        assert_eq!(transport.entries().len(), 1);
    }
}
