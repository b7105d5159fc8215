//! Per-response audit records.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Snapshot of one completed response, kept for in-session audit and
/// validation. Immutable; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ApiCallRecord {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub content_type: String,
    pub is_html: bool,
    pub is_json: bool,
    /// Sanitized, length-capped.
    pub body_preview: String,
    pub timestamp_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiCallRecord {
    pub(crate) fn stamp_now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Bounded in-memory trail of [`ApiCallRecord`]s, newest kept.
#[derive(Debug)]
pub(crate) struct AuditTrail {
    records: Mutex<VecDeque<ApiCallRecord>>,
    capacity: usize,
}

impl AuditTrail {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn push(&self, record: ApiCallRecord) {
        let mut records = self.records.lock().unwrap();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<ApiCallRecord> {
        self.records.lock().unwrap().iter().cloned().collect()
    }
}
