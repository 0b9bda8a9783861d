//! Property tests for the circuit breaker's state machine.
//!
//! Invariants checked:
//! - Opens after exactly `failure_threshold` consecutive closed-state failures
//! - Rejects every call while open, before the reset timeout elapses
//! - Admits a probe call once the reset timeout elapses and closes after
//!   enough half-open successes

use aya_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError, CircuitState};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tower::{service_fn, Service, ServiceExt};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn opens_after_exactly_failure_threshold_failures(
        failure_threshold in 1usize..=10,
        extra_calls in 0usize..5,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let svc = service_fn(|_: ()| async { Err::<(), _>("boom") });
            let layer = CircuitBreakerConfig::builder()
                .failure_threshold(failure_threshold)
                .reset_timeout(Duration::from_secs(60))
                .build_layer();
            let mut breaker = layer.layer(svc);

            for _ in 0..failure_threshold - 1 {
                let _ = breaker.ready().await.unwrap().call(()).await;
                prop_assert_eq!(breaker.state(), CircuitState::Closed);
            }

            let _ = breaker.ready().await.unwrap().call(()).await;
            prop_assert_eq!(breaker.state(), CircuitState::Open);

            for _ in 0..extra_calls {
                let result = breaker.ready().await.unwrap().call(()).await;
                prop_assert!(matches!(result, Err(CircuitBreakerError::OpenCircuit)));
            }

            Ok(())
        })?;
    }

    #[test]
    fn half_open_closes_after_needed_successes_regardless_of_threshold(
        half_open_success_needed in 1usize..=6,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let calls_clone = calls.clone();
            let svc = service_fn(move |_: ()| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, &str>(()) }
            });
            let layer = CircuitBreakerConfig::builder()
                .failure_threshold(1)
                .reset_timeout(Duration::from_millis(10))
                .half_open_success_needed(half_open_success_needed)
                .build_layer();
            let mut breaker = layer.layer(svc);

            breaker.force_open();
            prop_assert_eq!(breaker.state(), CircuitState::Open);
            tokio::time::sleep(Duration::from_millis(30)).await;

            for i in 0..half_open_success_needed {
                let result = breaker.ready().await.unwrap().call(()).await;
                prop_assert!(result.is_ok());
                if i + 1 < half_open_success_needed {
                    prop_assert_eq!(breaker.state(), CircuitState::HalfOpen);
                }
            }
            prop_assert_eq!(breaker.state(), CircuitState::Closed);

            Ok(())
        })?;
    }
}
