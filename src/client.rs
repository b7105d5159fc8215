//! Correlation-aware request pipeline.
//!
//! Every API call flows through [`ApiClient`]: correlation headers go out,
//! the response is classified before the caller ever sees a payload, and
//! each call emits exactly one `request_start` and one `request_end` log
//! event. Implementation details are split into submodules under
//! `src/client/`.

pub mod builder;
pub mod core;
pub mod record;

pub use builder::ApiClientBuilder;
pub use core::ApiClient;
pub use record::ApiCallRecord;
