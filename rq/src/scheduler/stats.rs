//! Scheduler statistics

use std::time::Duration;

use serde::Serialize;

/// Smoothing factor applied to each new latency sample
const LATENCY_SMOOTHING: f64 = 0.1;

/// Running counters owned by the scheduler
#[derive(Debug, Default, Clone)]
pub(crate) struct StatsCollector {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rate_limited_requests: u64,
    pub cached_responses: u64,
    average_response_time_ms: Option<f64>,
}

impl StatsCollector {
    /// Fold a successful dispatch latency into the moving average
    pub fn record_success(&mut self, latency: Duration) {
        self.successful_requests += 1;
        let sample = latency.as_micros() as f64 / 1000.0;
        self.average_response_time_ms = Some(match self.average_response_time_ms {
            None => sample,
            Some(avg) => avg * (1.0 - LATENCY_SMOOTHING) + sample * LATENCY_SMOOTHING,
        });
    }

    pub fn record_failure(&mut self) {
        self.failed_requests += 1;
    }

    pub fn average_response_time_ms(&self) -> f64 {
        self.average_response_time_ms.unwrap_or(0.0)
    }
}

/// Point-in-time view of a scheduler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rate_limited_requests: u64,
    pub cached_responses: u64,
    pub average_response_time_ms: f64,
    pub queue_size: usize,
    pub in_flight_count: usize,
    pub pending_retries: usize,
    pub cache_size: usize,
    pub cache_evictions: u64,
    pub cache_hit_rate_percent: f64,
    /// `"<used>/<max> in last <secs>s"`
    pub current_window_usage: String,
}

/// Render window usage as `"<used>/<max> in last <secs>s"`
pub(crate) fn format_window_usage(used: usize, max: u32, window: Duration) -> String {
    format!("{}/{} in last {}s", used, max, window.as_millis() / 1000)
}
