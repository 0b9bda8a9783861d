use crate::error::RetryError;
use crate::policy::RetryPolicy;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tower_layer::Layer;

/// `tower::Layer` that wraps a service with [`Retry`].
#[derive(Clone)]
pub struct RetryLayer<Req, E> {
    policy: Arc<RetryPolicy<E>>,
    _phantom: std::marker::PhantomData<fn() -> Req>,
}

impl<Req, E> RetryLayer<Req, E> {
    pub fn new(policy: RetryPolicy<E>) -> Self {
        Self {
            policy: Arc::new(policy),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<S, Req, E> Layer<S> for RetryLayer<Req, E> {
    type Service = Retry<S, Req, E>;

    fn layer(&self, inner: S) -> Self::Service {
        Retry {
            inner,
            policy: self.policy.clone(),
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Retries a service up to its policy's `max_attempts`, applying backoff
/// between attempts and classifying errors through the policy's predicate.
///
/// Simplified relative to a general-purpose retry middleware: attempts are
/// fixed per policy (no per-request dynamic attempt count, no shared retry
/// budget); the orchestration core only needs a bounded attempt loop with
/// backoff, both for outbound HTTP calls and (conceptually) for queue
/// handler retries.
pub struct Retry<S, Req, E> {
    inner: S,
    policy: Arc<RetryPolicy<E>>,
    _phantom: std::marker::PhantomData<fn() -> Req>,
}

impl<S: Clone, Req, E> Clone for Retry<S, Req, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            policy: self.policy.clone(),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<S, Req> Service<Req> for Retry<S, Req, S::Error>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    Req: Clone + Send + 'static,
{
    type Response = S::Response;
    type Error = RetryError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(RetryError::NotRetryable)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut svc = self.inner.clone();
        let policy = self.policy.clone();

        Box::pin(async move {
            let mut attempt = 0usize;
            loop {
                let result = svc.call(req.clone()).await;
                match result {
                    Ok(res) => return Ok(res),
                    Err(err) => {
                        if !policy.should_retry(&err) {
                            return Err(RetryError::NotRetryable(err));
                        }
                        if attempt + 1 >= policy.max_attempts {
                            return Err(RetryError::Exhausted(err));
                        }
                        let delay = policy.next_backoff(attempt);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::FixedInterval;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct FlakyService {
        calls: Arc<AtomicUsize>,
        fail_until: usize,
    }

    impl Service<()> for FlakyService {
        type Response = &'static str;
        type Error = &'static str;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: ()) -> Self::Future {
            let call_num = self.calls.fetch_add(1, Ordering::SeqCst);
            if call_num < self.fail_until {
                std::future::ready(Err("not yet"))
            } else {
                std::future::ready(Ok("ok"))
            }
        }
    }

    #[tokio::test]
    async fn successful_request_no_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(3, Arc::new(FixedInterval::new(Duration::from_millis(1))));
        let mut retry = RetryLayer::new(policy).layer(FlakyService {
            calls: calls.clone(),
            fail_until: 0,
        });

        let result = retry.ready().await.unwrap().call(()).await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_failure_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(3, Arc::new(FixedInterval::new(Duration::from_millis(1))));
        let mut retry = RetryLayer::new(policy).layer(FlakyService {
            calls: calls.clone(),
            fail_until: 2,
        });

        let result = retry.ready().await.unwrap().call(()).await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::new(2, Arc::new(FixedInterval::new(Duration::from_millis(1))));
        let mut retry = RetryLayer::new(policy).layer(FlakyService {
            calls: calls.clone(),
            fail_until: 100,
        });

        let result = retry.ready().await.unwrap().call(()).await;
        assert!(matches!(result, Err(RetryError::Exhausted("not yet"))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
