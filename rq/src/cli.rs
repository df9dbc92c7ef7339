//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::domain::Priority;

/// RateQueue - scheduler for outbound API requests
#[derive(Parser)]
#[command(
    name = "rq",
    about = "Rate-limited, prioritized, caching scheduler for outbound API requests",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Drive the scheduler with a simulated transport and report stats
    Simulate {
        /// Number of requests to submit
        #[arg(short = 'n', long, default_value = "20")]
        requests: u32,

        /// Simulated dispatch latency in milliseconds
        #[arg(long, default_value = "50")]
        latency_ms: u64,

        /// Reject every Nth dispatch as rate limited
        #[arg(long)]
        rate_limit_every: Option<u64>,

        /// Retry-After seconds reported with simulated rejections
        #[arg(long)]
        retry_after_secs: Option<u64>,

        /// Number of distinct cache keys to cycle through (0 disables caching)
        #[arg(long, default_value = "0")]
        distinct_keys: u32,

        /// Override max requests per window
        #[arg(long)]
        max_per_window: Option<u32>,

        /// Override window size in milliseconds
        #[arg(long)]
        window_ms: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Fetch URLs through the scheduler
    Fetch {
        /// URLs (or paths relative to the configured base URL)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Priority class for every request
        #[arg(short, long, default_value = "normal")]
        priority: Priority,

        /// Cache responses keyed by URL
        #[arg(long)]
        cache: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Path of the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ratequeue")
        .join("logs")
        .join("rq.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::parse_from(["rq", "simulate", "-n", "5", "--rate-limit-every", "2", "-f", "json"]);
        match cli.command {
            Command::Simulate {
                requests,
                rate_limit_every,
                format,
                ..
            } => {
                assert_eq!(requests, 5);
                assert_eq!(rate_limit_every, Some(2));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_fetch_priority() {
        let cli = Cli::parse_from(["rq", "-l", "debug", "fetch", "--priority", "high", "https://a.test"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Fetch { urls, priority, cache, .. } => {
                assert_eq!(urls, vec!["https://a.test".to_string()]);
                assert_eq!(priority, Priority::High);
                assert!(!cache);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("ratequeue/logs/rq.log"));
    }
}
