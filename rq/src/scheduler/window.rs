//! Sliding-window admission control

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Added to computed waits so a re-check does not land just short of the window edge
pub const WAIT_BUFFER: Duration = Duration::from_millis(100);

/// Floor for computed waits, prevents hot looping on a full window
pub const MIN_WAIT: Duration = Duration::from_millis(1000);

/// Tracks admission timestamps within the trailing window
#[derive(Debug)]
pub struct RateWindow {
    window: Duration,
    max_requests: u32,
    /// Ascending admission timestamps
    admissions: VecDeque<Instant>,
}

impl RateWindow {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            admissions: VecDeque::new(),
        }
    }

    /// Drop admissions at or before `now - window`
    pub fn prune(&mut self, now: Instant) {
        while self
            .admissions
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            self.admissions.pop_front();
        }
    }

    /// Whether one more request may be dispatched now
    pub fn can_admit(&mut self, now: Instant) -> bool {
        self.prune(now);
        self.admissions.len() < self.max_requests as usize
    }

    /// How long to sleep before re-checking admission
    pub fn wait_time(&self, now: Instant) -> Duration {
        match self.admissions.front() {
            None => Duration::ZERO,
            Some(oldest) => {
                let reopens_at = *oldest + self.window;
                let wait = reopens_at.saturating_duration_since(now) + WAIT_BUFFER;
                debug!(wait_ms = wait.as_millis() as u64, "RateWindow::wait_time: computed");
                wait.max(MIN_WAIT)
            }
        }
    }

    pub fn record_admission(&mut self, now: Instant) {
        self.admissions.push_back(now);
        self.prune(now);
    }

    /// Admissions currently counted (as of the last prune)
    pub fn used(&self) -> usize {
        self.admissions.len()
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
