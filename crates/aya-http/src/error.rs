/// Errors returned by [`crate::ResilientHttpClient::execute`].
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The circuit breaker rejected the request without sending it.
    #[error("circuit open for {client}")]
    CircuitOpen { client: String },

    /// The retry budget was exhausted; carries the last transport error or
    /// response status observed.
    #[error("request to {client} failed after retries: {source}")]
    Exhausted {
        client: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The underlying transport returned an error that isn't retryable
    /// (e.g. a request build error, not a network failure).
    #[error("request to {client} failed: {source}")]
    NotRetryable {
        client: String,
        #[source]
        source: reqwest::Error,
    },
}

impl HttpError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
