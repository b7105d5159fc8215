//! Bounded in-memory log buffer.

use super::LogEntry;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Shared, bounded FIFO of pending log entries.
///
/// Cloning shares the underlying queue. All mutations run synchronously
/// under the lock, so a drain is atomic with respect to concurrent appends.
/// The cap is enforced on every mutation; the buffer never holds more than
/// `max_buffer` entries.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, dropping the oldest entries when the cap is
    /// exceeded. Returns `true` when the buffer already held `batch_size`
    /// entries, i.e. a batch is ready for delivery ahead of the new entry.
    pub fn append(&self, entry: LogEntry, batch_size: usize, max_buffer: usize) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let batch_ready = batch_size > 0 && entries.len() >= batch_size;
        entries.push_back(entry);
        while entries.len() > max_buffer {
            entries.pop_front();
        }
        batch_ready
    }

    /// Take up to `batch_size` of the oldest entries.
    pub fn drain_batch(&self, batch_size: usize) -> Vec<LogEntry> {
        let mut entries = self.entries.lock().unwrap();
        let take = batch_size.min(entries.len());
        entries.drain(..take).collect()
    }

    /// Take everything currently buffered.
    pub fn drain_all(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().drain(..).collect()
    }

    /// Re-insert a failed batch at the front in its original order, then
    /// enforce the cap by dropping the oldest entries. Entries recorded
    /// after the failed flush stay newer than the requeued batch.
    pub fn requeue_front(&self, batch: Vec<LogEntry>, max_buffer: usize) {
        let mut entries = self.entries.lock().unwrap();
        for entry in batch.into_iter().rev() {
            entries.push_front(entry);
        }
        while entries.len() > max_buffer {
            entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
