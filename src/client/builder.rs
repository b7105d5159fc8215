use crate::client::core::ApiClient;
use crate::shipper::{ConsoleLogTransport, LogShipper, ShipperConfig};
use crate::{Error, Result};
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ApiClient`] instances.
///
/// Keep this surface small and predictable. A shipper can be shared across
/// clients; when none is supplied the client gets a console-only one.
pub struct ApiClientBuilder {
    base_url: Option<String>,
    shipper: Option<Arc<LogShipper>>,
    timeout: Option<Duration>,
    audit_capacity: usize,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            shipper: None,
            timeout: None,
            audit_capacity: 256,
        }
    }

    /// Backend API base URL (e.g. `http://backend:9000`). Required.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Shared log shipper all pipeline events go through.
    pub fn shipper(mut self, shipper: Arc<LogShipper>) -> Self {
        self.shipper = Some(shipper);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// How many [`crate::client::ApiCallRecord`]s to retain (newest kept).
    pub fn audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity;
        self
    }

    /// Build the client. Must run inside a tokio runtime (the default
    /// shipper spawns its flush timer at construction).
    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::runtime("base_url is required"))?
            .trim_end_matches('/')
            .to_string();

        // Env-overridable timeout, builder value wins.
        let timeout = self.timeout.unwrap_or_else(|| {
            let secs = env::var("TRACELINK_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(30);
            Duration::from_secs(secs)
        });

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Transport)?;

        let shipper = self.shipper.unwrap_or_else(|| {
            LogShipper::new(ShipperConfig::default(), Arc::new(ConsoleLogTransport))
        });

        Ok(ApiClient::new(http, base_url, shipper, self.audit_capacity))
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
