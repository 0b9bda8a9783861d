use std::fmt;

/// Error returned by a circuit-breaker-wrapped service.
#[derive(Debug, Clone)]
pub enum CircuitBreakerError<E> {
    /// The circuit was open; the inner service was never called.
    OpenCircuit,
    /// The inner service returned this error.
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::OpenCircuit)
    }

    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::OpenCircuit => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenCircuit => write!(f, "circuit breaker is open"),
            Self::Inner(e) => write!(f, "{e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for CircuitBreakerError<E> {}

impl<E> From<E> for CircuitBreakerError<E> {
    fn from(e: E) -> Self {
        Self::Inner(e)
    }
}
