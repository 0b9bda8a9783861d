//! Exponential-backoff-with-jitter and a bounded retry `tower::Service`
//! wrapper, shared by the resilient HTTP client and (as a bare function) by
//! the durable queue's caller-computed `Fail` backoff.

pub mod backoff;
pub mod error;
pub mod layer;
pub mod policy;

pub use backoff::{compute_backoff, ExponentialBackoff, ExponentialJitterBackoff, FixedInterval, FnInterval, IntervalFunction};
pub use error::RetryError;
pub use layer::{Retry, RetryLayer};
pub use policy::{RetryPolicy, RetryPredicate};
