//! Errors surfaced on a request's future

use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportError;

/// Final outcome of a request that did not succeed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// Still rate limited after every allowed retry
    #[error("Rate limited after {attempts} attempts (last retry-after {retry_after:?})")]
    RateLimited {
        attempts: u32,
        retry_after: Option<Duration>,
    },

    /// Non-retryable dispatch failure
    #[error("Request failed: {0}")]
    Request(TransportError),

    /// The transport panicked while dispatching this request
    #[error("Dispatch panicked: {0}")]
    DispatchPanicked(String),

    /// Discarded because the scheduler shut down
    #[error("Scheduler terminated")]
    Terminated,
}

impl SchedulerError {
    pub fn is_terminated(&self) -> bool {
        matches!(self, SchedulerError::Terminated)
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SchedulerError::RateLimited { .. })
    }
}
