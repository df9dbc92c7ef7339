//! RateQueue - scheduler for outbound API requests
//!
//! RateQueue sits between application code and a rate-limited downstream
//! API. Callers submit opaque requests and await their results; the
//! scheduler decides when each one actually goes out.
//!
//! # Core Concepts
//!
//! - **Sliding Window**: never more than N admitted requests in the trailing window
//! - **Priority Classes**: high before normal before low, FIFO within a class
//! - **Backoff**: rate-limit rejections are retried, honoring `Retry-After`
//! - **Response Cache**: repeat requests with a live cache key skip the queue
//!
//! # Modules
//!
//! - [`scheduler`] - Queue, rate window, retry, stats and the drain loop
//! - [`cache`] - Expiring key/value store
//! - [`transport`] - Dispatch seam and the reqwest HTTP transport
//! - [`domain`] - Priorities and request ids
//! - [`config`] - Configuration file loading
//! - [`cli`] - Command-line interface

pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod scheduler;
pub mod transport;

// Re-export commonly used types
pub use cache::{CacheStats, CacheStore};
pub use config::Config;
pub use domain::{IdGenerator, Priority, RequestId, SequentialIds, UuidIds};
pub use scheduler::{
    QueueEntry, ResponseFuture, Scheduler, SchedulerConfig, SchedulerError, SchedulerStats, SubmitOptions,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, HttpTransportConfig, Transport, TransportError};
