//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use eyre::{Result, eyre};

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SchedulerConfig {
    /// Max admitted requests per rate window
    #[serde(default = "default_max_requests_per_window")]
    pub max_requests_per_window: u32,

    /// Rate window duration in milliseconds
    #[serde(default = "default_window_size_ms")]
    pub window_size_ms: u64,

    /// Retries allowed for a rate-limited request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Interval between full cache sweeps in milliseconds
    #[serde(default = "default_cache_sweep_interval_ms")]
    pub cache_sweep_interval_ms: u64,

    /// Interval of the idle-queue safety-net tick in milliseconds
    #[serde(default = "default_queue_safety_tick_ms")]
    pub queue_safety_tick_ms: u64,
}

fn default_max_requests_per_window() -> u32 {
    90
}

fn default_window_size_ms() -> u64 {
    120_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_retry_delay_ms() -> u64 {
    1000
}

fn default_cache_sweep_interval_ms() -> u64 {
    300_000
}

fn default_queue_safety_tick_ms() -> u64 {
    1000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: default_max_requests_per_window(),
            window_size_ms: default_window_size_ms(),
            max_retries: default_max_retries(),
            base_retry_delay_ms: default_base_retry_delay_ms(),
            cache_sweep_interval_ms: default_cache_sweep_interval_ms(),
            queue_safety_tick_ms: default_queue_safety_tick_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Get the rate window as a Duration
    pub fn window_size(&self) -> Duration {
        Duration::from_millis(self.window_size_ms)
    }

    pub fn base_retry_delay(&self) -> Duration {
        Duration::from_millis(self.base_retry_delay_ms)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.cache_sweep_interval_ms)
    }

    pub fn queue_safety_tick(&self) -> Duration {
        Duration::from_millis(self.queue_safety_tick_ms)
    }

    /// Reject settings that would stall or hot-loop the scheduler
    pub fn validate(&self) -> Result<()> {
        if self.max_requests_per_window == 0 {
            return Err(eyre!("max-requests-per-window must be greater than zero"));
        }
        if self.window_size_ms == 0 {
            return Err(eyre!("window-size-ms must be greater than zero"));
        }
        if self.cache_sweep_interval_ms == 0 {
            return Err(eyre!("cache-sweep-interval-ms must be greater than zero"));
        }
        if self.queue_safety_tick_ms == 0 {
            return Err(eyre!("queue-safety-tick-ms must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_requests_per_window, 90);
        assert_eq!(config.window_size_ms, 120_000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_retry_delay_ms, 1000);
        assert_eq!(config.cache_sweep_interval_ms, 300_000);
        assert_eq!(config.queue_safety_tick_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_durations() {
        let config = SchedulerConfig {
            window_size_ms: 1500,
            ..Default::default()
        };
        assert_eq!(config.window_size(), Duration::from_millis(1500));
        assert_eq!(config.base_retry_delay(), Duration::from_secs(1));
        assert_eq!(config.cache_sweep_interval(), Duration::from_secs(300));
        assert_eq!(config.queue_safety_tick(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "max-requests-per-window: 20\nwindow-size-ms: 1000\n";
        let config: SchedulerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_requests_per_window, 20);
        assert_eq!(config.window_size_ms, 1000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.queue_safety_tick_ms, 1000);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = SchedulerConfig {
            max_requests_per_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SchedulerConfig {
            window_size_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SchedulerConfig {
            queue_safety_tick_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
