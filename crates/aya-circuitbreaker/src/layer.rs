use crate::CircuitBreaker;
use crate::config::CircuitBreakerConfig;
use std::sync::Arc;

/// Wraps an inner service with circuit breaker behavior. Not a generic
/// `tower::Layer` impl since the request type isn't known until `.layer()`
/// is called with a concrete service.
#[derive(Clone)]
pub struct CircuitBreakerLayer {
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitBreakerLayer {
    pub fn new(config: impl Into<Arc<CircuitBreakerConfig>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    pub fn layer<S, Req, Res, Err>(&self, service: S) -> CircuitBreaker<S, Req, Res, Err> {
        CircuitBreaker::new(service, self.config.clone())
    }
}
