use serde_json::json;
use thiserror::Error;

/// Unified error type for the tracelink client layer.
///
/// The two classification variants ([`Error::Misroute`], [`Error::JsonParse`])
/// carry enough context to diagnose the failure without re-issuing the
/// request; their serialized form is stable and used verbatim in shipped log
/// entries.
#[derive(Debug, Error)]
pub enum Error {
    /// The response was answered by a static-file fallback (HTML where JSON
    /// was expected), an infrastructure/routing fault rather than a backend one.
    #[error("misrouted response for {request_method} {request_url}: got {content_type} (status {response_status}); {diagnostic_hint}")]
    Misroute {
        request_url: String,
        request_method: String,
        response_status: u16,
        content_type: String,
        body_preview: String,
        correlation_id: String,
        diagnostic_hint: String,
    },

    /// The backend was reached but returned invalid JSON while claiming the
    /// JSON content type, a contract violation.
    #[error("invalid JSON from {request_method} {request_url} (status {response_status}): {parse_error}")]
    JsonParse {
        request_url: String,
        request_method: String,
        response_status: u16,
        content_type: String,
        body_preview: String,
        correlation_id: String,
        parse_error: String,
    },

    /// The backend answered with valid JSON and a failing status. The message
    /// is the payload's canonical error field, or an HTTP-status fallback.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        correlation_id: String,
    },

    /// DNS/connection-level failure before any response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Typed decode failed after classification accepted the body as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("runtime error: {message}")]
    Runtime { message: String },
}

impl Error {
    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime {
            message: message.into(),
        }
    }

    /// The correlation id attached to this error, when it carries one.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Error::Misroute { correlation_id, .. }
            | Error::JsonParse { correlation_id, .. }
            | Error::Http { correlation_id, .. } => Some(correlation_id),
            _ => None,
        }
    }

    /// Serialized diagnostic form, suitable for log-entry context fields.
    /// Keys follow the wire contract (camelCase).
    pub fn report(&self) -> serde_json::Value {
        match self {
            Error::Misroute {
                request_url,
                request_method,
                response_status,
                content_type,
                body_preview,
                correlation_id,
                diagnostic_hint,
            } => json!({
                "kind": "misroute",
                "requestUrl": request_url,
                "requestMethod": request_method,
                "responseStatus": response_status,
                "contentType": content_type,
                "bodyPreview": body_preview,
                "correlationId": correlation_id,
                "diagnosticHint": diagnostic_hint,
            }),
            Error::JsonParse {
                request_url,
                request_method,
                response_status,
                content_type,
                body_preview,
                correlation_id,
                parse_error,
            } => json!({
                "kind": "jsonParse",
                "requestUrl": request_url,
                "requestMethod": request_method,
                "responseStatus": response_status,
                "contentType": content_type,
                "bodyPreview": body_preview,
                "correlationId": correlation_id,
                "parseError": parse_error,
            }),
            Error::Http {
                status,
                message,
                correlation_id,
            } => json!({
                "kind": "http",
                "responseStatus": status,
                "message": message,
                "correlationId": correlation_id,
            }),
            other => json!({
                "kind": "other",
                "message": other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn misroute() -> Error {
        Error::Misroute {
            request_url: "http://backend/api/characters".into(),
            request_method: "GET".into(),
            response_status: 200,
            content_type: "text/html".into(),
            body_preview: "<!doctype html>".into(),
            correlation_id: "abc123".into(),
            diagnostic_hint: "check the reverse proxy".into(),
        }
    }

    #[test]
    fn test_correlation_id_extraction() {
        assert_eq!(misroute().correlation_id(), Some("abc123"));
        assert_eq!(Error::runtime("x").correlation_id(), None);
    }

    #[test]
    fn test_misroute_report_fields() {
        let report = misroute().report();
        assert_eq!(report["kind"], "misroute");
        assert_eq!(report["requestUrl"], "http://backend/api/characters");
        assert_eq!(report["responseStatus"], 200);
        assert_eq!(report["correlationId"], "abc123");
        assert!(report["diagnosticHint"]
            .as_str()
            .unwrap()
            .contains("reverse proxy"));
    }

    #[test]
    fn test_json_parse_report_carries_parse_error() {
        let err = Error::JsonParse {
            request_url: "http://backend/api/x".into(),
            request_method: "POST".into(),
            response_status: 200,
            content_type: "application/json".into(),
            body_preview: "{broken".into(),
            correlation_id: "c1".into(),
            parse_error: "expected value at line 1".into(),
        };
        let report = err.report();
        assert_eq!(report["kind"], "jsonParse");
        assert!(report["parseError"].as_str().unwrap().contains("expected"));
        assert!(report.get("diagnosticHint").is_none());
    }

    #[test]
    fn test_http_error_display_is_message_only() {
        let err = Error::Http {
            status: 500,
            message: "Character not found".into(),
            correlation_id: "c2".into(),
        };
        assert_eq!(err.to_string(), "Character not found");
    }
}
