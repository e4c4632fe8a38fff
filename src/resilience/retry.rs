//! Timeout escalation.
//!
//! A backend call that hits its statement timeout is reissued once with a
//! cheaper parameter (typically a shorter lookback). Parameters are ordered
//! by cost, and a call already at or below the fallback is never retried.
//! The retry happens inside the loader, so the cache only ever sees the
//! final outcome.

use std::fmt;
use std::future::Future;

use tracing::warn;

use crate::error::BackendError;

/// Retries a call with a fallback parameter when it fails with a timeout.
#[derive(Debug, Clone)]
pub struct TimeoutFallback<P, C> {
    fallback: P,
    is_timeout: C,
}

impl<P> TimeoutFallback<P, fn(&BackendError) -> bool> {
    /// Falls back to `fallback` on [`BackendError::StatementTimeout`].
    pub fn on_statement_timeout(fallback: P) -> Self {
        Self {
            fallback,
            is_timeout: BackendError::is_timeout,
        }
    }
}

impl<P, C> TimeoutFallback<P, C>
where
    P: Clone + PartialOrd + fmt::Debug,
{
    /// `is_timeout` decides which errors are worth a retry with `fallback`.
    pub fn new(fallback: P, is_timeout: C) -> Self {
        Self {
            fallback,
            is_timeout,
        }
    }

    /// Runs `call(params)`, retrying once with the fallback parameter.
    ///
    /// Only a timeout on parameters costlier than the fallback is retried.
    /// An error from the retry is returned as is.
    pub async fn run<T, E, F, Fut>(&self, params: P, mut call: F) -> Result<T, E>
    where
        C: Fn(&E) -> bool,
        E: fmt::Display,
        F: FnMut(P) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let retry_allowed = params > self.fallback;
        match call(params.clone()).await {
            Ok(value) => Ok(value),
            Err(err) if retry_allowed && (self.is_timeout)(&err) => {
                warn!(
                    params = ?params,
                    fallback = ?self.fallback,
                    error = %err,
                    "query timed out, retrying with fallback parameters"
                );
                call(self.fallback.clone()).await
            }
            Err(err) => Err(err),
        }
    }
}
