//! Resilient outbound HTTP client.
//!
//! A pooled `reqwest::Client` wrapped first in a bounded retry loop
//! (`aya-retry`) and then in a circuit breaker (`aya-circuitbreaker`), so the
//! breaker only ever observes the outcome of a whole retry attempt, not each
//! individual send.
//!
//! ## Feature flags
//! - `tracing`: forwarded to `aya-circuitbreaker`/`aya-retry`.
//! - `metrics`: forwarded to `aya-circuitbreaker`.

mod client;
mod config;
mod error;

pub use client::{AttemptError, HttpRequest, ResilientHttpClient};
pub use config::{
    CircuitBreakerSettings, HttpClientConfig, HttpClientConfigBuilder, RetryStrategySettings,
    TransportSettings,
};
pub use error::HttpError;
