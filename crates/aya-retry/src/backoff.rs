use std::time::Duration;

/// Abstraction for computing retry intervals.
///
/// This trait allows for flexible backoff strategies including fixed delays,
/// exponential backoff, randomized backoff, and custom implementations.
pub trait IntervalFunction: Send + Sync {
    /// Computes the delay before the next retry attempt.
    ///
    /// # Arguments
    /// * `attempt` - The retry attempt number (0-indexed, so first retry is 0)
    fn next_interval(&self, attempt: usize) -> Duration;
}

/// Fixed interval backoff - returns the same duration for every retry.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    /// Creates a new fixed interval backoff.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _attempt: usize) -> Duration {
        self.duration
    }
}

/// Exponential backoff with configurable multiplier.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates a new exponential backoff with default multiplier of 2.0.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    /// Sets the multiplier for exponential growth.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the maximum interval to cap exponential growth.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        let multiplier = self.multiplier.powi(attempt as i32);
        let interval = self.initial_interval.mul_f64(multiplier);

        if let Some(max) = self.max_interval {
            interval.min(max)
        } else {
            interval
        }
    }
}

/// Exponential backoff with jitter, matching
/// `delay(n) = min(max_interval, initial_interval * multiplier^n * (1 + random_factor*(2U-1)))`
/// for `U` drawn uniformly from `[0, 1)`. Defaults mirror the resilient HTTP
/// client's: `initial=100ms`, `max=10s`, `multiplier=2.0`, `random_factor=0.1`.
#[derive(Debug, Clone)]
pub struct ExponentialJitterBackoff {
    initial_interval: Duration,
    multiplier: f64,
    random_factor: f64,
    max_interval: Duration,
}

impl Default for ExponentialJitterBackoff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            multiplier: 2.0,
            random_factor: 0.1,
            max_interval: Duration::from_secs(10),
        }
    }
}

impl ExponentialJitterBackoff {
    /// Creates a backoff with the given initial interval and jitter factor
    /// (clamped to `[0.0, 1.0]`), using the default multiplier and cap.
    pub fn new(initial_interval: Duration, random_factor: f64) -> Self {
        Self {
            initial_interval,
            random_factor: random_factor.clamp(0.0, 1.0),
            ..Self::default()
        }
    }

    /// Sets the multiplier for exponential growth.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the maximum interval to cap exponential growth.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }
}

impl IntervalFunction for ExponentialJitterBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        compute_backoff(
            attempt,
            self.initial_interval,
            self.multiplier,
            self.random_factor,
            self.max_interval,
        )
    }
}

/// Bare backoff computation shared by the HTTP client's retry layer and the
/// durable queue's caller-computed `Fail` backoff; the queue store itself
/// stays backoff-agnostic and just accepts whatever `visible_at` the caller
/// passes.
///
/// `attempt` is 0-indexed. `U` is drawn from `rand::thread_rng`.
pub fn compute_backoff(
    attempt: usize,
    initial_interval: Duration,
    multiplier: f64,
    random_factor: f64,
    max_interval: Duration,
) -> Duration {
    use rand::Rng;

    let base = initial_interval.as_secs_f64() * multiplier.powi(attempt as i32);
    let u: f64 = rand::thread_rng().gen_range(0.0..1.0);
    let jittered = base * (1.0 + random_factor * (2.0 * u - 1.0));
    Duration::from_secs_f64(jittered.max(0.0)).min(max_interval)
}

/// Function-based interval implementation.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Creates a new function-based interval.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}
