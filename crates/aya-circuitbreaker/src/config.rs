use std::time::Duration;

/// Configuration for the circuit breaker's three-state machine:
/// `failure_threshold` consecutive failures in `closed` open the circuit;
/// `reset_timeout` is how long it stays `open` before probing; and
/// `half_open_success_needed` successes in `half-open` close it again.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: usize,
    pub(crate) reset_timeout: Duration,
    pub(crate) half_open_success_needed: usize,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    pub fn failure_threshold(&self) -> usize {
        self.failure_threshold
    }

    pub fn reset_timeout(&self) -> Duration {
        self.reset_timeout
    }

    pub fn half_open_success_needed(&self) -> usize {
        self.half_open_success_needed
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfigBuilder::new().build()
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: usize,
    reset_timeout: Duration,
    half_open_success_needed: usize,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(10),
            half_open_success_needed: 2,
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the number of consecutive closed-state failures that open the
    /// circuit. Default: 5.
    pub fn failure_threshold(mut self, n: usize) -> Self {
        self.failure_threshold = n;
        self
    }

    /// Sets how long the circuit stays open before admitting a probe.
    /// Default: 10 seconds.
    pub fn reset_timeout(mut self, duration: Duration) -> Self {
        self.reset_timeout = duration;
        self
    }

    /// Sets the number of half-open successes required to close the
    /// circuit. Default: 2.
    pub fn half_open_success_needed(mut self, n: usize) -> Self {
        self.half_open_success_needed = n;
        self
    }

    /// Gives this breaker a human-readable name for observability.
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
            half_open_success_needed: self.half_open_success_needed,
            name: self.name,
        }
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
