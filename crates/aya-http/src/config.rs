use std::time::Duration;

/// Circuit breaker thresholds for the resilient HTTP client.
#[derive(Debug, Clone)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: usize,
    pub reset_timeout: Duration,
    pub half_open_success_needed: usize,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(10),
            half_open_success_needed: 2,
        }
    }
}

/// Retry/backoff thresholds for the resilient HTTP client.
#[derive(Debug, Clone)]
pub struct RetryStrategySettings {
    pub max_attempts: usize,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub random_factor: f64,
}

impl Default for RetryStrategySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            random_factor: 0.1,
        }
    }
}

/// Connection pool knobs, mirroring `reqwest::ClientBuilder`'s pool options.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub max_idle_conns_per_host: usize,
    pub idle_conn_timeout: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_idle_conns_per_host: 100,
            idle_conn_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration for a [`crate::ResilientHttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub circuit_breaker: CircuitBreakerSettings,
    pub retry_strategy: RetryStrategySettings,
    pub transport: TransportSettings,
    /// Status codes at or above this are retryable server failures.
    /// Anything below is a final response, even if it's a 4xx.
    pub server_error_threshold: u16,
    pub name: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            circuit_breaker: CircuitBreakerSettings::default(),
            retry_strategy: RetryStrategySettings::default(),
            transport: TransportSettings::default(),
            server_error_threshold: 500,
            name: String::from("http_client"),
        }
    }
}

impl HttpClientConfig {
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`].
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn failure_threshold(mut self, n: usize) -> Self {
        self.config.circuit_breaker.failure_threshold = n;
        self
    }

    pub fn reset_timeout(mut self, duration: Duration) -> Self {
        self.config.circuit_breaker.reset_timeout = duration;
        self
    }

    pub fn half_open_success_needed(mut self, n: usize) -> Self {
        self.config.circuit_breaker.half_open_success_needed = n;
        self
    }

    pub fn max_attempts(mut self, n: usize) -> Self {
        self.config.retry_strategy.max_attempts = n;
        self
    }

    pub fn initial_interval(mut self, duration: Duration) -> Self {
        self.config.retry_strategy.initial_interval = duration;
        self
    }

    pub fn max_interval(mut self, duration: Duration) -> Self {
        self.config.retry_strategy.max_interval = duration;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.retry_strategy.multiplier = multiplier;
        self
    }

    pub fn random_factor(mut self, random_factor: f64) -> Self {
        self.config.retry_strategy.random_factor = random_factor;
        self
    }

    pub fn server_error_threshold(mut self, threshold: u16) -> Self {
        self.config.server_error_threshold = threshold;
        self
    }

    pub fn max_idle_conns_per_host(mut self, n: usize) -> Self {
        self.config.transport.max_idle_conns_per_host = n;
        self
    }

    pub fn idle_conn_timeout(mut self, duration: Duration) -> Self {
        self.config.transport.idle_conn_timeout = duration;
        self
    }

    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.config.transport.connect_timeout = duration;
        self
    }

    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.config.transport.request_timeout = duration;
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}
