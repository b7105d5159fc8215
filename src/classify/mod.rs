//! Response classification: genuine JSON vs. misrouted HTML fallback.
//!
//! The failure mode this module exists for: a reverse proxy or dev server
//! answering an API request with the frontend's `index.html` (status 200,
//! `text/html`, SPA shell in the body). Downstream JSON parsing then fails
//! with a message that says nothing about the real cause. The classifier
//! turns that into an explicit outcome before any payload decoding happens.

mod hint;
mod sanitize;

pub use hint::diagnostic_hint;
pub use sanitize::{sanitize_preview, BodySanitizer, MAX_PREVIEW_LEN};

/// Outcome of inspecting a completed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The response is (syntactically) the JSON the caller asked for.
    GenuineJson,
    /// The response is an HTML document, almost certainly a static-file
    /// fallback that should never have answered this request.
    MisroutedHtml,
    /// The response claims to be JSON but its body does not parse.
    MalformedJson,
}

/// Root-mount markers of a single-page-app shell served where JSON was
/// expected.
const SPA_SHELL_MARKERS: [&str; 2] = [r#"<div id="root""#, r#"<div id="app""#];

/// Classify a completed response from its declared content type and body.
///
/// HTML detection runs first and wins regardless of HTTP status: a 200 HTML
/// answer to an API call is exactly the silent misroute this crate exists to
/// catch. Callers fetching intentionally non-JSON payloads (binary
/// downloads) must not route them through here.
pub fn classify(content_type: Option<&str>, body: &str) -> Classification {
    if looks_like_html(content_type, body) {
        return Classification::MisroutedHtml;
    }

    let declares_json = content_type
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("application/json") || ct.contains("+json")
        })
        .unwrap_or(false);

    if declares_json && !body.trim().is_empty() {
        if serde_json::from_str::<serde_json::Value>(body).is_err() {
            return Classification::MalformedJson;
        }
    }

    Classification::GenuineJson
}

fn looks_like_html(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type {
        if ct.to_ascii_lowercase().contains("text/html") {
            return true;
        }
    }

    let trimmed = body.trim_start().to_ascii_lowercase();
    if trimmed.starts_with("<!doctype") || trimmed.starts_with("<html") {
        return true;
    }

    SPA_SHELL_MARKERS.iter().any(|m| trimmed.contains(m))
}

/// True when the body carries the root mount element of an SPA shell.
pub(crate) fn has_spa_shell_marker(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    SPA_SHELL_MARKERS.iter().any(|m| lower.contains(m))
}
