use crate::config::CircuitBreakerConfig;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Closed,
            1 => Self::Open,
            _ => Self::HalfOpen,
        }
    }
}

/// The circuit breaker's shared state.
///
/// The admission check (`is_allowed`) is lock-free: it reads `state`
/// atomically and, for `Open`, reads `last_failure_nano` atomically to
/// compare against `reset_timeout` without ever taking the mutex. Only the
/// open-to-half-open transition (triggered by that timeout check) and the
/// state-transition bodies themselves take `transition_lock`, which also
/// guards against two threads racing the same transition. Every inbound
/// request calls `is_allowed`, so keeping that path lock-free matters far
/// more than the occasional transition taking a mutex.
pub(crate) struct Circuit {
    state: AtomicU8,
    last_failure_nano: AtomicU64,
    failure_count: AtomicU64,
    half_open_success_count: AtomicU64,
    transition_lock: Mutex<()>,
    epoch: Instant,
}

impl Circuit {
    pub fn new() -> Self {
        let epoch = Instant::now();
        Self {
            state: AtomicU8::new(CircuitState::Closed as u8),
            last_failure_nano: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            half_open_success_count: AtomicU64::new(0),
            transition_lock: Mutex::new(()),
            epoch,
        }
    }

    fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Lock-free on the `Closed` and `HalfOpen` paths. Only the `Open` path,
    /// when the reset timeout has elapsed, takes the transition lock to move
    /// to `HalfOpen`.
    pub fn is_allowed(&self, config: &CircuitBreakerConfig) -> bool {
        match self.state() {
            // Half-open passes every request through; each outcome is
            // recorded and either closes the circuit after enough
            // successes or reopens it on the first failure.
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let last_failure = self.last_failure_nano.load(Ordering::Acquire);
                let elapsed = Duration::from_nanos(self.now_nanos().saturating_sub(last_failure));
                if elapsed < config.reset_timeout {
                    return false;
                }
                self.try_transition_to_half_open()
            }
        }
    }

    fn try_transition_to_half_open(&self) -> bool {
        let _guard = self.transition_lock.lock().unwrap();
        // Re-read under the lock: another thread may have already flipped
        // this to HalfOpen (or even back to Open) between our lock-free
        // check and acquiring the lock.
        if self.state() != CircuitState::Open {
            return self.state() == CircuitState::HalfOpen;
        }
        self.half_open_success_count.store(0, Ordering::Release);
        self.state.store(CircuitState::HalfOpen as u8, Ordering::Release);
        true
    }

    pub fn record_success(&self, config: &CircuitBreakerConfig) {
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "outcome" => "success").increment(1);

        if self.state() == CircuitState::HalfOpen {
            let successes = self.half_open_success_count.fetch_add(1, Ordering::AcqRel) + 1;
            if successes >= config.half_open_success_needed as u64 {
                self.transition_to(CircuitState::Closed);
            }
        }
    }

    pub fn record_failure(&self, config: &CircuitBreakerConfig) {
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "outcome" => "failure").increment(1);

        self.last_failure_nano.store(self.now_nanos(), Ordering::Release);

        match self.state() {
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open);
            }
            CircuitState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= config.failure_threshold as u64 {
                    self.transition_to(CircuitState::Open);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn force_open(&self) {
        self.last_failure_nano.store(self.now_nanos(), Ordering::Release);
        self.transition_to(CircuitState::Open);
    }

    pub fn force_closed(&self) {
        self.transition_to(CircuitState::Closed);
    }

    pub fn reset(&self) {
        self.transition_to(CircuitState::Closed);
    }

    fn transition_to(&self, state: CircuitState) {
        let _guard = self.transition_lock.lock().unwrap();

        let from = self.state();
        #[cfg(feature = "tracing")]
        if from != state {
            tracing::info!(?from, to = ?state, "circuit breaker state transition");
        }

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "from" => state_label(from),
                "to" => state_label(state)
            )
            .increment(1);
        }

        self.failure_count.store(0, Ordering::Release);
        self.half_open_success_count.store(0, Ordering::Release);
        self.state.store(state as u8, Ordering::Release);
    }
}

#[cfg(feature = "metrics")]
fn state_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "Closed",
        CircuitState::Open => "Open",
        CircuitState::HalfOpen => "HalfOpen",
    }
}
