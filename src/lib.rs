//! # tracelink
//!
//! Client-side network-integrity and telemetry layer for applications
//! talking to a JSON backend through infrastructure that can silently
//! misroute requests.
//!
//! ## Overview
//!
//! The hardest failure to diagnose in a proxied frontend/backend setup is
//! an API request answered by the static-file fallback: status 200,
//! `text/html`, an SPA shell where JSON was expected. tracelink classifies
//! every response before callers see a payload, threads a correlation
//! identifier through every request header and log record, ships logs to a
//! collection endpoint in resilient batches, and keeps a push-stream open
//! for job progress.
//!
//! ## Key Features
//!
//! - **Request Pipeline**: [`ApiClient`] is the single choke point for all
//!   API calls: correlation headers, paired start/end log events, typed
//!   errors on classification failure
//! - **Response Classification**: [`classify::classify`] decides genuine
//!   JSON vs. misrouted HTML vs. malformed JSON, with diagnostic hints and
//!   unconditional body-preview sanitization
//! - **Log Shipping**: [`LogShipper`] batches records with size/timer flush
//!   triggers and bounded requeue-on-failure
//! - **Push Streams**: [`PushStream`] maintains one SSE subscription with
//!   parse-and-drop message handling and idempotent close
//! - **Notifications**: [`ToastCenter`] renders errors as auto-expiring
//!   notices deep-linking into correlation-filtered logs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tracelink::{ApiClientBuilder, CorrelationContext};
//!
//! #[tokio::main]
//! async fn main() -> tracelink::Result<()> {
//!     let client = ApiClientBuilder::new()
//!         .base_url("http://backend:9000")
//!         .build()?;
//!
//!     let ctx = CorrelationContext::new_interaction();
//!     let characters: serde_json::Value =
//!         client.get("/api/characters", Some(&ctx)).await?;
//!     println!("{characters}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`correlation`] | Correlation/interaction identifiers |
//! | [`classify`] | Response classification, hints, sanitization |
//! | [`client`] | The request pipeline and audit trail |
//! | [`shipper`] | Batching log shipper and delivery transports |
//! | [`stream`] | Push-stream (SSE) subscription client |
//! | [`toast`] | Toast/notification surface |

pub mod classify;
pub mod client;
pub mod correlation;
pub mod shipper;
pub mod stream;
pub mod toast;

// Re-export main types for convenience
pub use classify::Classification;
pub use client::{ApiCallRecord, ApiClient, ApiClientBuilder};
pub use correlation::CorrelationContext;
pub use shipper::{LogEntry, LogLevel, LogShipper, ShipperConfig};
pub use stream::PushStream;
pub use toast::{Toast, ToastCenter, ToastKind};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::Error;
