//! Shared error taxonomy for the orchestration core.
//!
//! Every component wraps its own failures in `AyaError` before they cross a
//! service boundary: transient I/O and handler errors always carry the
//! originating operation's context.

/// The distinct error kinds recognized across the queue, HTTP client,
/// worker runtime, and coordination store.
#[derive(Debug, thiserror::Error)]
pub enum AyaError {
    /// Network error, non-2xx classified as retryable, or timeout, with the
    /// attempt budget exhausted.
    #[error("transient I/O error in {operation}: {source}")]
    TransientIo {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The circuit breaker rejected the call without attempting it.
    #[error("circuit open for {client}")]
    CircuitOpen { client: String },

    /// A worker's `execute` panicked; the panic was caught and converted.
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: String, message: String },

    /// A handler returned an error while processing a queue item.
    #[error("handler error for queue item {item_id} (type {item_type}): {source}")]
    HandlerFailed {
        item_id: String,
        item_type: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No handler was registered for a queue item's type.
    #[error("no handler registered for queue item type {item_type}")]
    HandlerNotRegistered { item_type: String },

    /// A stored timestamp failed to parse as RFC3339Nano.
    #[error("invalid time value for key {key}: {source}")]
    InvalidTime {
        key: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A configuration value or invariant was violated; a programming bug.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl AyaError {
    pub fn transient_io<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TransientIo {
            operation,
            source: Box::new(source),
        }
    }

    pub fn handler_failed<E>(item_id: impl Into<String>, item_type: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::HandlerFailed {
            item_id: item_id.into(),
            item_type: item_type.into(),
            source: Box::new(source),
        }
    }

    pub fn is_transient_io(&self) -> bool {
        matches!(self, Self::TransientIo { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    pub fn is_worker_panic(&self) -> bool {
        matches!(self, Self::WorkerPanicked { .. })
    }
}
