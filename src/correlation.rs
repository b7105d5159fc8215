//! Correlation context for end-to-end request tracing.
//!
//! A [`CorrelationContext`] carries the tokens that tie one user-visible
//! action to every request header and log line it produces. The context is
//! immutable once created; call sites that have no context simply let the
//! request pipeline mint a fresh one.

use uuid::Uuid;

/// Request-scoped (and optionally interaction-scoped) trace identifiers.
///
/// `correlation_id` identifies a single request; `interaction_id`, when
/// present, groups several sequential requests into one logical user
/// interaction (e.g. everything triggered by one button click).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    correlation_id: String,
    interaction_id: Option<String>,
}

impl CorrelationContext {
    /// Create a context for a single request with no surrounding interaction.
    pub fn new() -> Self {
        Self {
            correlation_id: new_token(),
            interaction_id: None,
        }
    }

    /// Create a context opening a new interaction. The interaction id can be
    /// shared across follow-up requests via [`CorrelationContext::next_request`].
    pub fn new_interaction() -> Self {
        Self {
            correlation_id: new_token(),
            interaction_id: Some(new_token()),
        }
    }

    /// Derive a fresh per-request context that stays inside this context's
    /// interaction (if any).
    pub fn next_request(&self) -> Self {
        Self {
            correlation_id: new_token(),
            interaction_id: self.interaction_id.clone(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn interaction_id(&self) -> Option<&str> {
        self.interaction_id.as_deref()
    }
}

impl Default for CorrelationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Random, URL-safe token (UUIDv4 without hyphens).
fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}
