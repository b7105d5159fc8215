use crate::classify::{classify, diagnostic_hint, BodySanitizer, Classification};
use crate::client::record::{ApiCallRecord, AuditTrail};
use crate::correlation::CorrelationContext;
use crate::shipper::{LogLevel, LogShipper};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// The single choke point through which all API calls flow.
///
/// Responsibilities per call: resolve or mint a [`CorrelationContext`],
/// attach the correlation headers, emit paired `request_start` /
/// `request_end` log events with timing, classify the response before any
/// payload reaches the caller, and raise the matching typed [`Error`] when
/// classification or the HTTP status fails.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    shipper: Arc<LogShipper>,
    sanitizer: BodySanitizer,
    audit: AuditTrail,
}

impl ApiClient {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: String,
        shipper: Arc<LogShipper>,
        audit_capacity: usize,
    ) -> Self {
        Self {
            http,
            base_url,
            shipper,
            sanitizer: BodySanitizer::new(),
            audit: AuditTrail::new(audit_capacity),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The shipper this client logs through (shared, for emitters).
    pub fn shipper(&self) -> &Arc<LogShipper> {
        &self.shipper
    }

    /// Completed-response audit trail collected this session.
    pub fn records(&self) -> Vec<ApiCallRecord> {
        self.audit.snapshot()
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        ctx: Option<&CorrelationContext>,
    ) -> Result<T> {
        self.send("GET", path, None, ctx).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        ctx: Option<&CorrelationContext>,
    ) -> Result<T> {
        self.send("POST", path, Some(body), ctx).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        ctx: Option<&CorrelationContext>,
    ) -> Result<T> {
        self.send("PUT", path, Some(body), ctx).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        ctx: Option<&CorrelationContext>,
    ) -> Result<T> {
        self.send("DELETE", path, None, ctx).await
    }

    /// Issue a JSON request and return the decoded payload.
    ///
    /// When `ctx` is `None` a fresh per-request context is minted, so call
    /// sites that don't thread a context still get full tracing.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
        ctx: Option<&CorrelationContext>,
    ) -> Result<T> {
        let ctx = ctx.cloned().unwrap_or_default();
        let url = format!("{}{}", self.base_url, path);
        let method = method.to_uppercase();

        self.log_start(&ctx, &method, &url, body);
        let started = Instant::now();

        let mut request = match method.as_str() {
            "POST" => self.http.post(&url),
            "PUT" => self.http.put(&url),
            "DELETE" => self.http.delete(&url),
            "PATCH" => self.http.patch(&url),
            _ => self.http.get(&url),
        };
        request = self
            .correlate(request, &ctx)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        match request.send().await {
            Ok(response) => self.finish(&ctx, &method, &url, response, started).await,
            Err(err) => Err(self.transport_failed(&ctx, &method, &url, started, err)),
        }
    }

    /// File/multipart upload. Same correlation, classification, and logging
    /// contract as [`ApiClient::send`]; the request content type is left to
    /// the transport so the multipart boundary gets set.
    pub async fn send_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        ctx: Option<&CorrelationContext>,
    ) -> Result<T> {
        let ctx = ctx.cloned().unwrap_or_default();
        let url = format!("{}{}", self.base_url, path);

        self.log_start(&ctx, "POST", &url, None);
        let started = Instant::now();

        let request = self.correlate(self.http.post(&url), &ctx).multipart(form);
        match request.send().await {
            Ok(response) => self.finish(&ctx, "POST", &url, response, started).await,
            Err(err) => Err(self.transport_failed(&ctx, "POST", &url, started, err)),
        }
    }

    fn correlate(
        &self,
        request: reqwest::RequestBuilder,
        ctx: &CorrelationContext,
    ) -> reqwest::RequestBuilder {
        let request = request.header("X-Correlation-ID", ctx.correlation_id());
        match ctx.interaction_id() {
            Some(interaction) => request.header("X-Interaction-ID", interaction),
            None => request,
        }
    }

    async fn finish<T: DeserializeOwned>(
        &self,
        ctx: &CorrelationContext,
        method: &str,
        url: &str,
        response: reqwest::Response,
        started: Instant,
    ) -> Result<T> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = match response.text().await {
            Ok(text) => text,
            Err(err) => return Err(self.transport_failed(ctx, method, url, started, err)),
        };

        let declared = (!content_type.is_empty()).then_some(content_type.as_str());
        let classification = classify(declared, &body);
        let preview = self.sanitizer.sanitize(&body);

        let outcome: Result<T> = match classification {
            Classification::MisroutedHtml => Err(Error::Misroute {
                request_url: url.to_string(),
                request_method: method.to_string(),
                response_status: status,
                content_type: content_type.clone(),
                body_preview: preview.clone(),
                correlation_id: ctx.correlation_id().to_string(),
                diagnostic_hint: diagnostic_hint(url, &body),
            }),
            Classification::MalformedJson => {
                let parse_error = serde_json::from_str::<Value>(&body)
                    .err()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "invalid JSON".to_string());
                Err(Error::JsonParse {
                    request_url: url.to_string(),
                    request_method: method.to_string(),
                    response_status: status,
                    content_type: content_type.clone(),
                    body_preview: preview.clone(),
                    correlation_id: ctx.correlation_id().to_string(),
                    parse_error,
                })
            }
            Classification::GenuineJson => {
                if (200..300).contains(&status) {
                    serde_json::from_str::<T>(&body).map_err(Error::Serialization)
                } else {
                    Err(Error::Http {
                        status,
                        message: error_payload_message(&body, status),
                        correlation_id: ctx.correlation_id().to_string(),
                    })
                }
            }
        };

        self.audit.push(ApiCallRecord {
            url: url.to_string(),
            method: method.to_string(),
            status,
            content_type,
            is_html: classification == Classification::MisroutedHtml,
            is_json: classification == Classification::GenuineJson,
            body_preview: preview,
            timestamp_ms: ApiCallRecord::stamp_now(),
            error: outcome.as_ref().err().map(|e| e.to_string()),
        });

        match &outcome {
            Ok(_) => self.log_end(ctx, method, url, status, started, None),
            Err(err) => self.log_end(ctx, method, url, status, started, Some(err)),
        }
        outcome
    }

    /// Network-level failure before (or while reading) a response: log
    /// `request_end` with status 0 and hand the transport error back.
    fn transport_failed(
        &self,
        ctx: &CorrelationContext,
        method: &str,
        url: &str,
        started: Instant,
        err: reqwest::Error,
    ) -> Error {
        let err = Error::Transport(err);
        self.log_end(ctx, method, url, 0, started, Some(&err));
        err
    }

    fn log_start(&self, ctx: &CorrelationContext, method: &str, url: &str, body: Option<&Value>) {
        let mut context = Map::new();
        context.insert("method".into(), method.into());
        context.insert("url".into(), url.into());
        if let Some(body) = body {
            context.insert(
                "body_preview".into(),
                self.sanitizer.sanitize(&body.to_string()).into(),
            );
        }
        self.shipper.record_correlated(
            ctx,
            LogLevel::Info,
            format!("{method} {url}"),
            Some("request_start"),
            Some(context),
        );
    }

    fn log_end(
        &self,
        ctx: &CorrelationContext,
        method: &str,
        url: &str,
        status: u16,
        started: Instant,
        error: Option<&Error>,
    ) {
        let mut context = Map::new();
        context.insert("method".into(), method.into());
        context.insert("url".into(), url.into());
        context.insert("status".into(), json!(status));
        context.insert(
            "elapsed_ms".into(),
            json!(started.elapsed().as_millis() as u64),
        );
        let (level, message) = match error {
            Some(err) => {
                context.insert("error".into(), err.report());
                (LogLevel::Error, format!("{method} {url} failed: {err}"))
            }
            None => (LogLevel::Info, format!("{method} {url} -> {status}")),
        };
        self.shipper
            .record_correlated(ctx, level, message, Some("request_end"), Some(context));
    }
}

/// Canonical error field of a failing JSON payload, HTTP-status fallback.
fn error_payload_message(body: &str, status: u16) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail")?.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {status}"))
}
