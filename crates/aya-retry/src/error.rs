use std::fmt;

/// Error returned by a retrying service once its attempt budget is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The wrapped service returned this error on the final attempt.
    #[error("retries exhausted: {0}")]
    Exhausted(E),
    /// The wrapped service returned an error the policy decided not to retry.
    #[error("non-retryable error: {0}")]
    NotRetryable(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted(e) | Self::NotRetryable(e) => e,
        }
    }
}

impl<E: fmt::Debug> RetryError<E> {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
}
