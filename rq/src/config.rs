//! RateQueue configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerConfig;
use crate::transport::HttpTransportConfig;

/// Main RateQueue configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Rate window, retry and timer settings
    pub scheduler: SchedulerConfig,

    /// HTTP transport settings
    pub http: HttpTransportConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate().context("Invalid scheduler configuration")
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .ratequeue.yml
        let local_config = PathBuf::from(".ratequeue.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/ratequeue/ratequeue.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ratequeue").join("ratequeue.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.log_level.is_none());
        assert_eq!(config.scheduler.max_requests_per_window, 90);
        assert_eq!(config.http.timeout_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

scheduler:
  max-requests-per-window: 20
  window-size-ms: 1000
  max-retries: 5
  base-retry-delay-ms: 250

http:
  base-url: https://api.example.com
  timeout-ms: 5000
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.scheduler.max_requests_per_window, 20);
        assert_eq!(config.scheduler.window_size_ms, 1000);
        assert_eq!(config.scheduler.max_retries, 5);
        assert_eq!(config.scheduler.base_retry_delay_ms, 250);
        assert_eq!(config.scheduler.cache_sweep_interval_ms, 300_000);
        assert_eq!(config.http.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.http.timeout_ms, 5000);
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "scheduler:\n  max-requests-per-window: 7").unwrap();

        let path = file.path().to_path_buf();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.scheduler.max_requests_per_window, 7);
        assert_eq!(config.scheduler.window_size_ms, 120_000);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/ratequeue.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_log_level() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log-level: warn").unwrap();

        let path = file.path().to_path_buf();
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let yaml = "scheduler:\n  window-size-ms: 0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
