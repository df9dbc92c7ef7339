//! Scheduler for outbound API requests
//!
//! Admits requests through a sliding rate window in priority order, serves
//! repeats from a time-boxed cache, and retries rate-limit rejections with
//! backoff. Dispatch is serialized: at most one request is in flight per
//! scheduler, which keeps the window count exact without extra coordination.

mod config;
mod core;
mod error;
mod queue;
mod request;
mod retry;
mod stats;
mod window;

pub use config::SchedulerConfig;
pub use core::Scheduler;
pub use error::SchedulerError;
pub use queue::{Prioritized, RequestQueue};
pub use request::{DEFAULT_CACHE_TTL, QueueEntry, RequestDescriptor, ResponseFuture, SubmitOptions};
pub use retry::{RetryDecision, RetryPolicy};
pub use stats::SchedulerStats;
pub use window::{MIN_WAIT, RateWindow, WAIT_BUFFER};
