//! HTTP status errors raised by the release provider

use tether_core::retry::{
    ClosurePredicate, HttpStatusError, HttpStatusPredicate, RetryError, RetryPredicate,
};
use thiserror::Error;

/// A request completed with a non-success HTTP status
#[derive(Debug, Error)]
#[error("{url} returned HTTP {status}")]
pub struct StatusError {
    pub status: u16,
    pub url: String,
}

impl StatusError {
    pub fn new(status: u16, url: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
        }
    }
}

impl HttpStatusError for StatusError {
    fn status_code(&self) -> Option<u16> {
        Some(self.status)
    }
}

/// Retry predicate for `anyhow` errors: transient statuses and transport
/// failures are retried, other HTTP statuses are not
pub(crate) fn transient_http() -> ClosurePredicate<impl Fn(&anyhow::Error) -> bool + Send + Sync> {
    let statuses = HttpStatusPredicate::default_http();
    ClosurePredicate::new(move |err: &anyhow::Error| match err.downcast_ref::<StatusError>() {
        Some(status) => statuses.should_retry(status),
        None => true,
    })
}

/// Unwrap a retry failure, noting the attempt count when retries happened
pub(crate) fn flatten_retry(err: RetryError<anyhow::Error>) -> anyhow::Error {
    let attempts = err.attempts();
    let source = err.into_source();
    if attempts > 1 {
        source.context(format!("gave up after {} attempts", attempts))
    } else {
        source
    }
}
