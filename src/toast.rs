//! Toast/notification surface.
//!
//! [`ToastCenter`] is the UI-facing sink that turns errors and events into
//! dismissible, auto-expiring notices. A toast carrying a correlation or
//! interaction identifier exposes a deep link into a log-viewing surface
//! pre-filtered by that identifier, so "view logs for this request" is one
//! activation away from any error the pipeline raises.

use crate::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Default lifetime for non-error toasts, in milliseconds.
pub const DEFAULT_DURATION_MS: u64 = 5000;
/// Errors linger longer so the deep link stays reachable.
pub const ERROR_DURATION_MS: u64 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

/// One displayed notice. `duration_ms == 0` means persist until dismissed.
#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub title: String,
    pub message: Option<String>,
    pub correlation_id: Option<String>,
    pub interaction_id: Option<String>,
    pub duration_ms: u64,
}

impl Toast {
    /// Log-viewer deep link for this toast's identifiers, preferring the
    /// interaction id (it covers the whole user action) over the
    /// per-request correlation id.
    pub fn log_link(&self) -> Option<String> {
        if let Some(interaction) = &self.interaction_id {
            return Some(format!("/logs?interaction_id={interaction}"));
        }
        self.correlation_id
            .as_ref()
            .map(|correlation| format!("/logs?correlation_id={correlation}"))
    }
}

/// Insertion-ordered collection of live toasts with timer-driven expiry.
pub struct ToastCenter {
    inner: Arc<Mutex<Vec<Toast>>>,
    next_id: AtomicU64,
}

impl ToastCenter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Show a toast with the default duration for its kind. Returns the id
    /// usable for early dismissal.
    pub fn show(
        &self,
        kind: ToastKind,
        title: impl Into<String>,
        message: Option<String>,
        correlation_id: Option<String>,
        interaction_id: Option<String>,
    ) -> u64 {
        let duration = match kind {
            ToastKind::Error => ERROR_DURATION_MS,
            _ => DEFAULT_DURATION_MS,
        };
        self.show_with_duration(kind, title, message, correlation_id, interaction_id, duration)
    }

    pub fn show_with_duration(
        &self,
        kind: ToastKind,
        title: impl Into<String>,
        message: Option<String>,
        correlation_id: Option<String>,
        interaction_id: Option<String>,
        duration_ms: u64,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let toast = Toast {
            id,
            kind,
            title: title.into(),
            message,
            correlation_id,
            interaction_id,
            duration_ms,
        };
        self.inner.lock().unwrap().push(toast);

        if duration_ms > 0 {
            let weak: Weak<Mutex<Vec<Toast>>> = Arc::downgrade(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(duration_ms)).await;
                if let Some(inner) = weak.upgrade() {
                    inner.lock().unwrap().retain(|t| t.id != id);
                }
            });
        }
        id
    }

    /// Error toast carrying the error's correlation id, so the rendered
    /// notice can offer "view logs for this request".
    pub fn error_from(&self, error: &Error) -> u64 {
        self.show(
            ToastKind::Error,
            "Request failed",
            Some(error.to_string()),
            error.correlation_id().map(str::to_string),
            None,
        )
    }

    /// Remove a toast regardless of its timer state. Unknown ids are a no-op.
    pub fn dismiss(&self, id: u64) {
        self.inner.lock().unwrap().retain(|t| t.id != id);
    }

    /// Activate a toast's log deep link: the toast is removed and the link
    /// returned for the host to navigate.
    pub fn follow_log_link(&self, id: u64) -> Option<String> {
        let mut toasts = self.inner.lock().unwrap();
        let idx = toasts.iter().position(|t| t.id == id)?;
        let link = toasts[idx].log_link();
        if link.is_some() {
            toasts.remove(idx);
        }
        link
    }

    /// Live toasts in render order (insertion order).
    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.lock().unwrap().clone()
    }
}

impl Default for ToastCenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(center: &ToastCenter, id: u64) -> bool {
        center.toasts().iter().any(|t| t.id == id)
    }

    #[tokio::test]
    async fn test_auto_expiry() {
        let center = ToastCenter::new();
        let id = center.show_with_duration(ToastKind::Info, "hi", None, None, None, 50);
        assert!(shown(&center, id));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!shown(&center, id));
    }

    #[tokio::test]
    async fn test_zero_duration_persists() {
        let center = ToastCenter::new();
        let id = center.show_with_duration(ToastKind::Warning, "sticky", None, None, None, 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(shown(&center, id));
        center.dismiss(id);
        assert!(!shown(&center, id));
    }

    #[tokio::test]
    async fn test_render_order_is_insertion_order() {
        let center = ToastCenter::new();
        let a = center.show(ToastKind::Info, "a", None, None, None);
        let b = center.show(ToastKind::Success, "b", None, None, None);
        let ids: Vec<_> = center.toasts().iter().map(|t| t.id).collect();
        assert_eq!(ids, [a, b]);
    }

    #[tokio::test]
    async fn test_error_toasts_linger_longer() {
        let center = ToastCenter::new();
        let err = center.show(ToastKind::Error, "boom", None, None, None);
        let info = center.show(ToastKind::Info, "fyi", None, None, None);
        let toasts = center.toasts();
        let err_toast = toasts.iter().find(|t| t.id == err).unwrap();
        let info_toast = toasts.iter().find(|t| t.id == info).unwrap();
        assert!(err_toast.duration_ms > info_toast.duration_ms);
    }

    #[tokio::test]
    async fn test_log_link_prefers_interaction_id() {
        let center = ToastCenter::new();
        let id = center.show(
            ToastKind::Error,
            "boom",
            None,
            Some("corr1".into()),
            Some("inter1".into()),
        );
        let link = center.follow_log_link(id).unwrap();
        assert_eq!(link, "/logs?interaction_id=inter1");
        assert!(!shown(&center, id));
    }

    #[tokio::test]
    async fn test_log_link_falls_back_to_correlation_id() {
        let toast = Toast {
            id: 1,
            kind: ToastKind::Error,
            title: "t".into(),
            message: None,
            correlation_id: Some("corr2".into()),
            interaction_id: None,
            duration_ms: 0,
        };
        assert_eq!(toast.log_link().unwrap(), "/logs?correlation_id=corr2");
    }

    #[tokio::test]
    async fn test_follow_link_without_ids_keeps_toast() {
        let center = ToastCenter::new();
        let id = center.show(ToastKind::Info, "plain", None, None, None);
        assert!(center.follow_log_link(id).is_none());
        assert!(shown(&center, id));
    }

    #[tokio::test]
    async fn test_error_from_carries_correlation() {
        let center = ToastCenter::new();
        let err = Error::Http {
            status: 500,
            message: "Character not found".into(),
            correlation_id: "abc".into(),
        };
        let id = center.error_from(&err);
        let toast = center
            .toasts()
            .into_iter()
            .find(|t| t.id == id)
            .unwrap();
        assert_eq!(toast.correlation_id.as_deref(), Some("abc"));
        assert_eq!(toast.message.as_deref(), Some("Character not found"));
    }
}
