//! In-process transport for demos and load rehearsal
//!
//! Sleeps for a fixed latency and rejects every Nth call as rate limited.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Transport, TransportError};

/// Simulated transport behavior
#[derive(Debug, Clone, Default)]
pub struct SimulatedConfig {
    /// Time each dispatch takes
    pub latency: Duration,

    /// Reject every Nth call with a rate limit (None never rejects)
    pub rate_limit_every: Option<u64>,

    /// Retry-After reported with simulated rejections
    pub retry_after: Option<Duration>,
}

/// Echoes the request back after `latency`
#[derive(Debug, Default)]
pub struct SimulatedTransport {
    config: SimulatedConfig,
    calls: AtomicU64,
}

impl SimulatedTransport {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            calls: AtomicU64::new(0),
        }
    }

    /// Dispatches attempted so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    type Request = String;
    type Response = String;

    async fn dispatch(&self, request: &String) -> Result<String, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%request, call, "SimulatedTransport::dispatch: called");

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        if let Some(every) = self.config.rate_limit_every
            && every > 0
            && call % every == 0
        {
            return Err(TransportError::RateLimited {
                retry_after: self.config.retry_after,
            });
        }

        Ok(format!("{} -> ok (call {})", request, call))
    }
}
