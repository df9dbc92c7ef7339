//! RateQueue CLI
//!
//! Entry point for driving the scheduler from the command line.

use std::fs;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use futures::future::join_all;
use tracing::{debug, info};

use ratequeue::cli::{Cli, Command, OutputFormat, get_log_path};
use ratequeue::config::Config;
use ratequeue::domain::Priority;
use ratequeue::scheduler::{Scheduler, SchedulerConfig, SchedulerStats, SubmitOptions};
use ratequeue::transport::{HttpRequest, HttpTransport, SimulatedConfig, SimulatedTransport};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        None => tracing::Level::INFO,
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Simulate {
            requests,
            latency_ms,
            rate_limit_every,
            retry_after_secs,
            distinct_keys,
            max_per_window,
            window_ms,
            format,
        } => {
            let mut scheduler_config = config.scheduler.clone();
            if let Some(max) = max_per_window {
                scheduler_config.max_requests_per_window = max;
            }
            if let Some(ms) = window_ms {
                scheduler_config.window_size_ms = ms;
            }

            let sim = SimulatedConfig {
                latency: Duration::from_millis(latency_ms),
                rate_limit_every,
                retry_after: retry_after_secs.map(Duration::from_secs),
            };
            cmd_simulate(scheduler_config, sim, requests, distinct_keys, format).await
        }
        Command::Fetch {
            urls,
            priority,
            cache,
            format,
        } => cmd_fetch(&config, urls, priority, cache, format).await,
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config).context("Failed to serialize config")?);
            Ok(())
        }
    }
}

async fn cmd_simulate(
    scheduler_config: SchedulerConfig,
    sim: SimulatedConfig,
    requests: u32,
    distinct_keys: u32,
    format: OutputFormat,
) -> Result<()> {
    info!(requests, distinct_keys, ?sim, "cmd_simulate: called");
    let scheduler = Scheduler::new(scheduler_config, SimulatedTransport::new(sim))?;
    scheduler.start();

    let priorities = [Priority::High, Priority::Normal, Priority::Low];
    let pending: Vec<_> = (0..requests)
        .map(|i| {
            let mut options = SubmitOptions::new().with_priority(priorities[i as usize % priorities.len()]);
            let endpoint = if distinct_keys > 0 {
                let key = format!("resource-{}", i % distinct_keys);
                options = options.with_cache_key(key.clone());
                format!("GET /{}", key)
            } else {
                format!("GET /item/{}", i)
            };
            scheduler.submit(endpoint, options)
        })
        .collect();

    let results = join_all(pending).await;
    let failures = results.iter().filter(|r| r.is_err()).count();
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        debug!(error = %err, "cmd_simulate: request failed");
    }

    let stats = scheduler.stats();
    scheduler.shutdown();

    print_stats(&stats, format)?;
    if failures > 0 && format == OutputFormat::Text {
        println!("{}", format!("{} request(s) failed", failures).red());
    }
    Ok(())
}

async fn cmd_fetch(config: &Config, urls: Vec<String>, priority: Priority, cache: bool, format: OutputFormat) -> Result<()> {
    info!(count = urls.len(), %priority, cache, "cmd_fetch: called");
    let transport = HttpTransport::new(&config.http).context("Failed to build HTTP client")?;
    let scheduler = Scheduler::new(config.scheduler.clone(), transport)?;
    scheduler.start();

    let pending: Vec<_> = urls
        .iter()
        .map(|url| {
            let mut options = SubmitOptions::new().with_priority(priority);
            if cache {
                options = options.with_cache_key(url.clone());
            }
            scheduler.submit(HttpRequest::get(url.clone()), options)
        })
        .collect();

    let results = join_all(pending).await;
    for (url, result) in urls.iter().zip(&results) {
        match result {
            Ok(response) => println!("{} {} ({} bytes)", response.status.to_string().green(), url, response.body.len()),
            Err(err) => println!("{} {}: {}", "ERR".red(), url, err),
        }
    }

    let stats = scheduler.stats();
    scheduler.shutdown();
    print_stats(&stats, format)
}

fn print_stats(stats: &SchedulerStats, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(stats).context("Failed to serialize stats")?);
        }
        OutputFormat::Text => {
            println!("{}", "Scheduler stats".bold());
            println!("  total requests:      {}", stats.total_requests);
            println!("  successful:          {}", stats.successful_requests.to_string().green());
            println!("  failed:              {}", stats.failed_requests.to_string().red());
            println!("  rate limited:        {}", stats.rate_limited_requests.to_string().yellow());
            println!("  cached responses:    {}", stats.cached_responses);
            println!("  avg response time:   {:.1}ms", stats.average_response_time_ms);
            println!("  queue / in flight:   {} / {}", stats.queue_size, stats.in_flight_count);
            println!("  cache size:          {}", stats.cache_size);
            println!("  cache hit rate:      {:.1}%", stats.cache_hit_rate_percent);
            println!("  window usage:        {}", stats.current_window_usage);
        }
    }
    Ok(())
}
