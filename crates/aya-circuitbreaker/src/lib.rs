//! Circuit breaker middleware for outbound calls.
//!
//! Three states (closed, open, half-open) with a lock-free admission
//! check on the hot path. Only the open-to-half-open timeout check and the
//! state transitions themselves take a mutex; see [`circuit::Circuit`] for
//! the rationale.
//!
//! ## Example
//! ```rust
//! use aya_circuitbreaker::CircuitBreakerConfig;
//! use tower::service_fn;
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let layer = CircuitBreakerConfig::builder()
//!         .failure_threshold(5)
//!         .build_layer();
//!
//!     let my_service = service_fn(|req| async move { Ok::<_, ()>(req) });
//!     let mut service = layer.layer(my_service);
//!
//!     let response = Service::call(&mut service, "hello").await.unwrap();
//!     assert_eq!(response, "hello");
//! }
//! ```
//!
//! ## Feature flags
//! - `metrics`: circuit-breaker call/transition counters via the `metrics` crate.
//! - `tracing`: state transition logging via the `tracing` crate.

use crate::circuit::Circuit;
use aya_core::EventListeners;
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

pub use circuit::CircuitState;
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;

mod circuit;
mod config;
mod error;
mod events;
mod layer;

pub(crate) type FailureClassifier<Res, Err> = dyn Fn(&Result<Res, Err>) -> bool + Send + Sync;
pub(crate) type SharedFailureClassifier<Res, Err> = Arc<FailureClassifier<Res, Err>>;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

impl CircuitBreakerConfigBuilder {
    /// Builds the configuration and wraps it in a [`CircuitBreakerLayer`].
    pub fn build_layer(self) -> CircuitBreakerLayer {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "circuitbreaker_calls_total",
                    "Total number of calls through the circuit breaker"
                );
                describe_counter!(
                    "circuitbreaker_transitions_total",
                    "Total number of circuit breaker state transitions"
                );
            });
        }
        CircuitBreakerLayer::new(self.build())
    }
}

fn default_failure_classifier<Res, Err>() -> SharedFailureClassifier<Res, Err> {
    Arc::new(|res: &Result<Res, Err>| res.is_err())
}

/// A `tower::Service` that admits, executes, and classifies calls through a
/// [`Circuit`], reporting the outcome back to it.
pub struct CircuitBreaker<S, Req, Res, Err> {
    inner: S,
    circuit: Arc<Circuit>,
    config: Arc<CircuitBreakerConfig>,
    failure_classifier: SharedFailureClassifier<Res, Err>,
    listeners: Arc<EventListeners<CircuitBreakerEvent>>,
    _phantom: std::marker::PhantomData<Req>,
}

impl<S, Req, Res, Err> CircuitBreaker<S, Req, Res, Err> {
    pub(crate) fn new(inner: S, config: Arc<CircuitBreakerConfig>) -> Self {
        Self {
            inner,
            circuit: Arc::new(Circuit::new()),
            config,
            failure_classifier: default_failure_classifier(),
            listeners: Arc::new(EventListeners::new()),
            _phantom: std::marker::PhantomData,
        }
    }

    /// Overrides which outcomes count as a breaker failure. The resilient
    /// HTTP client uses this to treat 4xx responses as final successes from
    /// the breaker's perspective while still treating 5xx/transport errors
    /// as failures.
    pub fn with_failure_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&Result<Res, Err>) -> bool + Send + Sync + 'static,
    {
        self.failure_classifier = Arc::new(classifier);
        self
    }

    /// Registers a listener that observes admission, outcome, and
    /// state-transition events for this breaker.
    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: aya_core::EventListener<CircuitBreakerEvent> + 'static,
    {
        Arc::get_mut(&mut self.listeners)
            .expect("add_listener must be called before cloning the breaker")
            .add(listener);
    }

    pub fn force_open(&self) {
        self.circuit.force_open();
    }

    pub fn force_closed(&self) {
        self.circuit.force_closed();
    }

    pub fn reset(&self) {
        self.circuit.reset();
    }

    pub fn state(&self) -> CircuitState {
        self.circuit.state()
    }
}

impl<S: Clone, Req, Res, Err> Clone for CircuitBreaker<S, Req, Res, Err> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            circuit: self.circuit.clone(),
            config: self.config.clone(),
            failure_classifier: self.failure_classifier.clone(),
            listeners: self.listeners.clone(),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<S, Req, Res, Err> Service<Req> for CircuitBreaker<S, Req, Res, Err>
where
    S: Service<Req, Response = Res, Error = Err> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Res: Send + 'static,
    Err: Send + 'static,
    Req: Send + 'static,
{
    type Response = Res;
    type Error = CircuitBreakerError<Err>;
    type Future = BoxFuture<'static, Result<Res, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let config = Arc::clone(&self.config);
        let circuit = Arc::clone(&self.circuit);
        let mut inner = self.inner.clone();
        let classifier = self.failure_classifier.clone();
        let listeners = self.listeners.clone();

        Box::pin(async move {
            if !circuit.is_allowed(&config) {
                #[cfg(feature = "metrics")]
                counter!("circuitbreaker_calls_total", "outcome" => "rejected").increment(1);

                #[cfg(feature = "tracing")]
                tracing::trace!(breaker = %config.name(), "circuit breaker rejected call");

                listeners.emit(&CircuitBreakerEvent::CallRejected {
                    pattern_name: config.name().to_string(),
                    timestamp: Instant::now(),
                });

                return Err(CircuitBreakerError::OpenCircuit);
            }

            listeners.emit(&CircuitBreakerEvent::CallPermitted {
                pattern_name: config.name().to_string(),
                timestamp: Instant::now(),
                state: circuit.state(),
            });

            let from_state = circuit.state();
            let result = inner.call(req).await;

            if classifier(&result) {
                circuit.record_failure(&config);
                listeners.emit(&CircuitBreakerEvent::FailureRecorded {
                    pattern_name: config.name().to_string(),
                    timestamp: Instant::now(),
                    state: circuit.state(),
                });
            } else {
                circuit.record_success(&config);
                listeners.emit(&CircuitBreakerEvent::SuccessRecorded {
                    pattern_name: config.name().to_string(),
                    timestamp: Instant::now(),
                    state: circuit.state(),
                });
            }

            let to_state = circuit.state();
            if to_state != from_state {
                listeners.emit(&CircuitBreakerEvent::StateTransition {
                    pattern_name: config.name().to_string(),
                    timestamp: Instant::now(),
                    from_state,
                    to_state,
                });
            }

            result.map_err(CircuitBreakerError::Inner)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tower::service_fn;
    use tower::ServiceExt;

    fn config() -> Arc<CircuitBreakerConfig> {
        Arc::new(
            CircuitBreakerConfig::builder()
                .failure_threshold(2)
                .reset_timeout(Duration::from_millis(20))
                .half_open_success_needed(1)
                .build(),
        )
    }

    #[tokio::test]
    async fn rejects_when_open() {
        let svc = service_fn(|_: ()| async { Err::<(), _>("boom") });
        let mut breaker = CircuitBreaker::new(svc, config());

        let _ = breaker.ready().await.unwrap().call(()).await;
        let _ = breaker.ready().await.unwrap().call(()).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        let result = breaker.ready().await.unwrap().call(()).await;
        assert!(matches!(result, Err(CircuitBreakerError::OpenCircuit)));
    }

    #[tokio::test]
    async fn closes_after_half_open_success() {
        let svc = service_fn(|_: ()| async { Ok::<_, &str>(()) });
        let cfg = Arc::new(
            CircuitBreakerConfig::builder()
                .failure_threshold(2)
                .reset_timeout(Duration::from_millis(20))
                .half_open_success_needed(2)
                .build(),
        );
        let mut breaker = CircuitBreaker::new(svc, cfg);
        breaker.force_open();
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;

        let result = breaker.ready().await.unwrap().call(()).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let result = breaker.ready().await.unwrap().call(()).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn failure_classifier_can_treat_errors_as_success() {
        // Simulates a 4xx response being a "final success" from the
        // breaker's perspective: the classifier only flags Err(_) that
        // represents a 5xx/transport failure.
        let svc = service_fn(|req: u16| async move {
            if req >= 500 {
                Err("server error")
            } else {
                Ok(req)
            }
        });
        let mut breaker = CircuitBreaker::new(svc, config())
            .with_failure_classifier(|res: &Result<u16, &str>| res.is_err());

        let result = breaker.ready().await.unwrap().call(404).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn listener_observes_call_and_transition_events() {
        use aya_core::FnListener;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let permitted = Arc::new(AtomicUsize::new(0));
        let transitions = Arc::new(AtomicUsize::new(0));
        let permitted_clone = permitted.clone();
        let transitions_clone = transitions.clone();

        let svc = service_fn(|_: ()| async { Err::<(), _>("boom") });
        let mut breaker = CircuitBreaker::new(svc, config());
        breaker.add_listener(FnListener::new(move |event: &CircuitBreakerEvent| {
            match event {
                CircuitBreakerEvent::CallPermitted { .. } => {
                    permitted_clone.fetch_add(1, Ordering::SeqCst);
                }
                CircuitBreakerEvent::StateTransition { .. } => {
                    transitions_clone.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }));

        let _ = breaker.ready().await.unwrap().call(()).await;
        let _ = breaker.ready().await.unwrap().call(()).await;

        assert_eq!(permitted.load(Ordering::SeqCst), 2);
        assert_eq!(transitions.load(Ordering::SeqCst), 1);
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
