use crate::config::HttpClientConfig;
use crate::error::HttpError;
use aya_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use aya_retry::{ExponentialJitterBackoff, Retry, RetryError, RetryLayer, RetryPolicy};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tower_layer::Layer;

/// A method/url/headers/body tuple that can be replayed across retry
/// attempts. `reqwest::Request` itself doesn't guarantee it can be cloned
/// (streaming bodies can't be), so the retry layer operates on this instead
/// and builds a fresh `reqwest::Request` per attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: reqwest::Method,
    pub url: reqwest::Url,
    pub headers: reqwest::header::HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: reqwest::Method, url: reqwest::Url) -> Self {
        Self {
            method,
            url,
            headers: reqwest::header::HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: reqwest::Url) -> Self {
        Self::new(reqwest::Method::GET, url)
    }

    pub fn json<T: serde::Serialize>(
        method: reqwest::Method,
        url: reqwest::Url,
        body: &T,
    ) -> Result<Self, serde_json::Error> {
        let mut req = Self::new(method, url);
        req.body = Some(serde_json::to_vec(body)?);
        req.headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Ok(req)
    }

    fn into_reqwest(self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let mut builder = client.request(self.method, self.url).headers(self.headers);
        if let Some(body) = self.body {
            builder = builder.body(body);
        }
        builder
    }
}

/// Error produced by a single send attempt, before retry/breaker policy is
/// applied. A server-error-range status is turned into an `Err` here so the
/// retry layer (which only retries `Err`) can see it; everything else
/// (including 4xx) is an `Ok` response.
#[derive(Debug)]
pub enum AttemptError {
    Transport(reqwest::Error),
    ServerStatus(reqwest::StatusCode),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::ServerStatus(status) => write!(f, "server error status {status}"),
        }
    }
}

impl std::error::Error for AttemptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::ServerStatus(_) => None,
        }
    }
}

#[derive(Clone)]
struct SendService {
    client: reqwest::Client,
    server_error_threshold: u16,
}

impl Service<HttpRequest> for SendService {
    type Response = reqwest::Response;
    type Error = AttemptError;
    type Future =
        std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let builder = req.into_reqwest(&self.client);
        let threshold = self.server_error_threshold;
        Box::pin(async move {
            let response = builder.send().await.map_err(AttemptError::Transport)?;
            if response.status().as_u16() >= threshold {
                return Err(AttemptError::ServerStatus(response.status()));
            }
            Ok(response)
        })
    }
}

type RetryingSend = Retry<SendService, HttpRequest, AttemptError>;
type BreakerSvc = CircuitBreaker<RetryingSend, HttpRequest, reqwest::Response, RetryError<AttemptError>>;

/// Pooled HTTP transport wrapped in a circuit breaker and bounded retry
/// policy. Every call: the breaker admits or fast-fails, the
/// retry layer sends and re-sends on transport errors or server-error
/// statuses up to `max_attempts` with jittered backoff, and the breaker
/// observes only the final outcome of that loop.
pub struct ResilientHttpClient {
    inner: BreakerSvc,
    name: String,
}

impl ResilientHttpClient {
    pub fn new(config: HttpClientConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.transport.max_idle_conns_per_host)
            .pool_idle_timeout(config.transport.idle_conn_timeout)
            .connect_timeout(config.transport.connect_timeout)
            .timeout(config.transport.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: HttpClientConfig) -> Self {
        let send = SendService {
            client,
            server_error_threshold: config.server_error_threshold,
        };

        let backoff = Arc::new(
            ExponentialJitterBackoff::new(
                config.retry_strategy.initial_interval,
                config.retry_strategy.random_factor,
            )
            .multiplier(config.retry_strategy.multiplier)
            .max_interval(config.retry_strategy.max_interval),
        );
        let retry_policy = RetryPolicy::new(config.retry_strategy.max_attempts, backoff);
        let retrying: RetryingSend = RetryLayer::new(retry_policy).layer(send);

        let breaker_config = Arc::new(
            CircuitBreakerConfig::builder()
                .failure_threshold(config.circuit_breaker.failure_threshold)
                .reset_timeout(config.circuit_breaker.reset_timeout)
                .half_open_success_needed(config.circuit_breaker.half_open_success_needed)
                .name(config.name.clone())
                .build(),
        );
        let breaker: BreakerSvc =
            aya_circuitbreaker::CircuitBreakerLayer::new(breaker_config).layer(retrying);

        Self {
            inner: breaker,
            name: config.name,
        }
    }

    /// Runs `request` through admission, send-and-retry, and outcome
    /// reporting. Returns the final response (including a non-retried 4xx)
    /// or a terminal [`HttpError`].
    pub async fn execute(&mut self, request: HttpRequest) -> Result<reqwest::Response, HttpError> {
        match self.inner.call(request).await {
            Ok(response) => Ok(response),
            Err(aya_circuitbreaker::CircuitBreakerError::OpenCircuit) => {
                Err(HttpError::CircuitOpen {
                    client: self.name.clone(),
                })
            }
            Err(aya_circuitbreaker::CircuitBreakerError::Inner(RetryError::Exhausted(err))) => {
                Err(HttpError::Exhausted {
                    client: self.name.clone(),
                    source: Box::new(err),
                })
            }
            Err(aya_circuitbreaker::CircuitBreakerError::Inner(RetryError::NotRetryable(
                AttemptError::Transport(e),
            ))) => Err(HttpError::NotRetryable {
                client: self.name.clone(),
                source: e,
            }),
            Err(aya_circuitbreaker::CircuitBreakerError::Inner(RetryError::NotRetryable(
                err @ AttemptError::ServerStatus(_),
            ))) => Err(HttpError::Exhausted {
                client: self.name.clone(),
                source: Box::new(err),
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.state()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
