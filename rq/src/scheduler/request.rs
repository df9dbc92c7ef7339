//! Request descriptors, submit options, and the caller-side future

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::error::SchedulerError;
use super::queue::Prioritized;
use crate::domain::{Priority, RequestId};

/// Default cache lifetime for a response
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(300_000);

/// Per-request submit options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SubmitOptions {
    pub priority: Priority,

    /// Cache the response under this key, and serve it from there while live
    pub cache_key: Option<String>,

    pub cache_ttl_ms: u64,

    /// Skip the cache lookup (a successful response is still cached)
    pub bypass_cache: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            priority: Priority::Normal,
            cache_key: None,
            cache_ttl_ms: DEFAULT_CACHE_TTL.as_millis() as u64,
            bypass_cache: false,
        }
    }
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn with_bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

/// A pending request as the scheduler sees it
///
/// Plain data: the channel that resolves the caller lives beside it, not in it.
#[derive(Debug)]
pub struct RequestDescriptor<R> {
    pub id: RequestId,
    pub request: R,
    pub priority: Priority,
    pub cache_key: Option<String>,
    pub cache_ttl: Duration,
    pub bypass_cache: bool,
    pub retry_count: u32,
    pub created_at: Instant,
}

impl<R> RequestDescriptor<R> {
    pub fn new(id: RequestId, request: R, options: SubmitOptions) -> Self {
        let cache_ttl = options.cache_ttl();
        Self {
            id,
            request,
            priority: options.priority,
            cache_key: options.cache_key,
            cache_ttl,
            bypass_cache: options.bypass_cache,
            retry_count: 0,
            created_at: Instant::now(),
        }
    }
}

impl<R> Prioritized for RequestDescriptor<R> {
    fn priority(&self) -> Priority {
        self.priority
    }
}

/// Queued entry for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEntry {
    pub id: RequestId,
    pub priority: Priority,
    pub retry_count: u32,
    pub waiting_ms: u64,
}

/// Resolves exactly once with the request's outcome
#[derive(Debug)]
pub struct ResponseFuture<V> {
    id: RequestId,
    rx: oneshot::Receiver<Result<V, SchedulerError>>,
}

impl<V> ResponseFuture<V> {
    pub(crate) fn new(id: RequestId, rx: oneshot::Receiver<Result<V, SchedulerError>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }
}

impl<V> Future for ResponseFuture<V> {
    type Output = Result<V, SchedulerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the scheduler went away without resolving us
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SchedulerError::Terminated)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_options_defaults() {
        let options = SubmitOptions::default();
        assert_eq!(options.priority, Priority::Normal);
        assert_eq!(options.cache_key, None);
        assert_eq!(options.cache_ttl(), Duration::from_secs(300));
        assert!(!options.bypass_cache);
    }

    #[test]
    fn test_submit_options_builders() {
        let options = SubmitOptions::new()
            .with_priority(Priority::High)
            .with_cache_key("summoner:42")
            .with_cache_ttl(Duration::from_millis(100))
            .with_bypass_cache(true);

        assert_eq!(options.priority, Priority::High);
        assert_eq!(options.cache_key.as_deref(), Some("summoner:42"));
        assert_eq!(options.cache_ttl_ms, 100);
        assert!(options.bypass_cache);
    }

    #[test]
    fn test_descriptor_from_options() {
        let descriptor = RequestDescriptor::new(
            RequestId::from("req-1"),
            "payload",
            SubmitOptions::new().with_priority(Priority::Low).with_cache_key("k"),
        );
        assert_eq!(descriptor.retry_count, 0);
        assert_eq!(descriptor.priority(), Priority::Low);
        assert_eq!(descriptor.cache_key.as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn test_response_future_resolves() {
        let (tx, rx) = oneshot::channel();
        let fut = ResponseFuture::new(RequestId::from("req-1"), rx);
        assert_eq!(fut.id().as_str(), "req-1");

        tx.send(Ok(7)).unwrap();
        assert_eq!(fut.await, Ok(7));
    }

    #[tokio::test]
    async fn test_response_future_dropped_sender_is_terminated() {
        let (tx, rx) = oneshot::channel::<Result<u32, SchedulerError>>();
        let fut = ResponseFuture::new(RequestId::from("req-1"), rx);
        drop(tx);

        assert_eq!(fut.await, Err(SchedulerError::Terminated));
    }
}
