//! Scheduler implementation

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::config::SchedulerConfig;
use super::error::SchedulerError;
use super::queue::{Prioritized, RequestQueue};
use super::request::{QueueEntry, RequestDescriptor, ResponseFuture, SubmitOptions};
use super::retry::{RetryDecision, RetryPolicy};
use super::stats::{SchedulerStats, StatsCollector, format_window_usage};
use super::window::RateWindow;
use crate::cache::CacheStore;
use crate::domain::{IdGenerator, Priority, SequentialIds};
use crate::transport::{Transport, TransportError};

type Reply<V> = oneshot::Sender<Result<V, SchedulerError>>;

/// A descriptor paired with the channel that resolves its caller
struct Job<T: Transport> {
    descriptor: RequestDescriptor<T::Request>,
    reply: Reply<T::Response>,
}

impl<T: Transport> Job<T> {
    fn resolve(self, outcome: Result<T::Response, SchedulerError>) {
        // The caller may have dropped its future; nothing to deliver then
        if self.reply.send(outcome).is_err() {
            debug!(id = %self.descriptor.id, "Job::resolve: caller went away");
        }
    }
}

impl<T: Transport> Prioritized for Job<T> {
    fn priority(&self) -> Priority {
        self.descriptor.priority
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Draining,
}

/// Internal state protected by mutex
struct SchedulerInner<T: Transport> {
    phase: Phase,
    queue: RequestQueue<Job<T>>,
    window: RateWindow,
    cache: CacheStore<T::Response>,
    stats: StatsCollector,
    in_flight: usize,
    pending_retries: usize,
    terminated: bool,
}

/// State shared between the handle, the drain worker, and the timers
struct Shared<T: Transport> {
    config: SchedulerConfig,
    transport: Arc<T>,
    ids: Box<dyn IdGenerator>,
    retry: RetryPolicy,
    inner: Mutex<SchedulerInner<T>>,
    shutdown_tx: watch::Sender<bool>,
}

enum Step<T: Transport> {
    Dispatch(Job<T>),
    Wait(Duration),
}

/// The Scheduler admits outbound requests through a sliding rate window,
/// in priority order, one dispatch at a time.
///
/// Must be used from within a Tokio runtime: submissions spawn the drain
/// worker on demand, and [`Scheduler::start`] spawns the background timers.
pub struct Scheduler<T: Transport> {
    shared: Arc<Shared<T>>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Transport> Scheduler<T> {
    /// Create a new scheduler with sequential request ids
    pub fn new(config: SchedulerConfig, transport: T) -> eyre::Result<Self> {
        Self::with_id_generator(config, transport, SequentialIds::new())
    }

    /// Create a new scheduler drawing request ids from `ids`
    ///
    /// Fails if `config` does not validate: a zero window limit would never
    /// admit anything, and zero timer periods cannot drive an interval.
    pub fn with_id_generator(
        config: SchedulerConfig,
        transport: T,
        ids: impl IdGenerator + 'static,
    ) -> eyre::Result<Self> {
        debug!(?config, "Scheduler::new: called");
        config.validate()?;
        let (shutdown_tx, _) = watch::channel(false);
        let inner = SchedulerInner {
            phase: Phase::Idle,
            queue: RequestQueue::new(),
            window: RateWindow::new(config.window_size(), config.max_requests_per_window),
            cache: CacheStore::new(),
            stats: StatsCollector::default(),
            in_flight: 0,
            pending_retries: 0,
            terminated: false,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                retry: RetryPolicy::new(config.max_retries, config.base_retry_delay()),
                config,
                transport: Arc::new(transport),
                ids: Box::new(ids),
                inner: Mutex::new(inner),
                shutdown_tx,
            }),
            timers: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Start the queue safety-net tick and the cache sweep
    ///
    /// Idempotent; a no-op after shutdown.
    pub fn start(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        if !timers.is_empty() || self.shared.lock().terminated {
            debug!("Scheduler::start: already started or terminated");
            return;
        }

        info!(
            max_requests_per_window = self.shared.config.max_requests_per_window,
            window_size_ms = self.shared.config.window_size_ms,
            "Scheduler starting"
        );
        timers.push(Arc::clone(&self.shared).spawn_safety_tick());
        timers.push(Arc::clone(&self.shared).spawn_cache_sweep());
    }

    /// Submit a request
    ///
    /// Served from the cache without queueing when `options.cache_key` names
    /// a live entry (unless `bypass_cache` is set). The returned future
    /// resolves exactly once.
    pub fn submit(&self, request: T::Request, options: SubmitOptions) -> ResponseFuture<T::Response> {
        let id = self.shared.ids.next_id();
        debug!(%id, priority = %options.priority, cache_key = ?options.cache_key, "Scheduler::submit: called");

        let (reply, rx) = oneshot::channel();
        let future = ResponseFuture::new(id.clone(), rx);
        let job = Job::<T> {
            descriptor: RequestDescriptor::new(id, request, options),
            reply,
        };

        let cached = {
            let mut inner = self.shared.lock();
            inner.stats.total_requests += 1;

            if inner.terminated {
                debug!("Scheduler::submit: terminated, rejecting");
                Some(Err(SchedulerError::Terminated))
            } else {
                match &job.descriptor.cache_key {
                    Some(key) if !job.descriptor.bypass_cache => {
                        let hit = inner.cache.get(key, Instant::now());
                        if hit.is_some() {
                            inner.stats.cached_responses += 1;
                        }
                        hit.map(Ok)
                    }
                    _ => None,
                }
            }
        };

        match cached {
            Some(outcome) => {
                debug!(id = %job.descriptor.id, "Scheduler::submit: resolved without queueing");
                job.resolve(outcome);
            }
            None => self.shared.enqueue(job),
        }
        future
    }

    /// Snapshot of counters and current usage
    pub fn stats(&self) -> SchedulerStats {
        let mut inner = self.shared.lock();
        inner.window.prune(Instant::now());
        let cache = inner.cache.stats();

        SchedulerStats {
            total_requests: inner.stats.total_requests,
            successful_requests: inner.stats.successful_requests,
            failed_requests: inner.stats.failed_requests,
            rate_limited_requests: inner.stats.rate_limited_requests,
            cached_responses: inner.stats.cached_responses,
            average_response_time_ms: inner.stats.average_response_time_ms(),
            queue_size: inner.queue.len(),
            in_flight_count: inner.in_flight,
            pending_retries: inner.pending_retries,
            cache_size: cache.size,
            cache_evictions: cache.evictions,
            cache_hit_rate_percent: cache.hit_rate_percent(),
            current_window_usage: format_window_usage(
                inner.window.used(),
                inner.window.max_requests(),
                inner.window.window(),
            ),
        }
    }

    /// Queued requests in dequeue order
    pub fn queue_details(&self) -> Vec<QueueEntry> {
        let inner = self.shared.lock();
        let now = Instant::now();
        inner
            .queue
            .iter()
            .map(|job| QueueEntry {
                id: job.descriptor.id.clone(),
                priority: job.descriptor.priority,
                retry_count: job.descriptor.retry_count,
                waiting_ms: now.saturating_duration_since(job.descriptor.created_at).as_millis() as u64,
            })
            .collect()
    }

    /// Drop one cached response, returning whether it existed
    pub fn invalidate(&self, key: &str) -> bool {
        debug!(%key, "Scheduler::invalidate: called");
        self.shared.lock().cache.remove(key)
    }

    pub fn clear_cache(&self) {
        debug!("Scheduler::clear_cache: called");
        self.shared.lock().cache.clear();
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.lock().terminated
    }

    /// Stop the timers, reject everything still queued, and clear the cache
    ///
    /// An in-flight dispatch finishes naturally. Idempotent.
    pub fn shutdown(&self) {
        let rejected: Vec<Job<T>> = {
            let mut inner = self.shared.lock();
            if inner.terminated {
                debug!("Scheduler::shutdown: already terminated");
                return;
            }
            inner.terminated = true;
            inner.cache.clear();
            inner.queue.drain().collect()
        };

        info!(rejected = rejected.len(), "Scheduler shutting down");
        for job in rejected {
            job.resolve(Err(SchedulerError::Terminated));
        }

        self.shared.shutdown_tx.send_replace(true);
        self.abort_timers();
    }

    fn abort_timers(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        for timer in timers.drain(..) {
            timer.abort();
        }
    }
}

impl<T: Transport> Drop for Scheduler<T> {
    fn drop(&mut self) {
        self.abort_timers();
    }
}

impl<T: Transport> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, SchedulerInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a job and make sure a drain worker is running
    fn enqueue(self: &Arc<Self>, job: Job<T>) {
        let start_drain = {
            let mut inner = self.lock();
            if inner.terminated {
                drop(inner);
                debug!(id = %job.descriptor.id, "Shared::enqueue: terminated, rejecting");
                job.resolve(Err(SchedulerError::Terminated));
                return;
            }

            let id = job.descriptor.id.clone();
            let position = inner.queue.enqueue(job);
            debug!(%id, position, queue_size = inner.queue.len(), "Shared::enqueue: queued");
            inner.begin_draining()
        };

        if start_drain {
            tokio::spawn(Arc::clone(self).drain());
        }
    }

    /// Start a drain worker if idle with work waiting
    fn wake(self: &Arc<Self>) {
        let start_drain = {
            let mut inner = self.lock();
            !inner.terminated && !inner.queue.is_empty() && inner.begin_draining()
        };

        if start_drain {
            debug!("Shared::wake: idle with queued work, starting drain");
            tokio::spawn(Arc::clone(self).drain());
        }
    }

    /// Drain the queue, one dispatch at a time, until it is empty
    async fn drain(self: Arc<Self>) {
        debug!("Shared::drain: started");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            let step = {
                let mut inner = self.lock();
                let now = Instant::now();
                if inner.terminated || inner.queue.is_empty() {
                    inner.phase = Phase::Idle;
                    debug!("Shared::drain: queue empty, going idle");
                    return;
                }

                if !inner.window.can_admit(now) {
                    Step::Wait(inner.window.wait_time(now))
                } else if let Some(job) = inner.queue.dequeue() {
                    inner.in_flight += 1;
                    Step::Dispatch(job)
                } else {
                    inner.phase = Phase::Idle;
                    return;
                }
            };

            match step {
                Step::Wait(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "Shared::drain: window full, waiting");
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = shutdown_rx.changed() => {}
                    }
                }
                Step::Dispatch(job) => self.dispatch(job).await,
            }
        }
    }

    /// Run one dispatch in its own task so a panicking transport only fails this job
    async fn dispatch(self: &Arc<Self>, job: Job<T>) {
        let Job { descriptor, reply } = job;
        let id = descriptor.id.clone();
        debug!(%id, retry_count = descriptor.retry_count, "Shared::dispatch: called");

        let transport = Arc::clone(&self.transport);
        let started = Instant::now();
        let task = tokio::spawn(async move {
            let result = transport.dispatch(&descriptor.request).await;
            (descriptor, result)
        });

        match task.await {
            Ok((descriptor, result)) => self.complete(Job { descriptor, reply }, result, started),
            Err(err) => {
                warn!(%id, error = %err, "Dispatch task failed");
                {
                    let mut inner = self.lock();
                    inner.in_flight = inner.in_flight.saturating_sub(1);
                    inner.stats.record_failure();
                }
                if reply.send(Err(SchedulerError::DispatchPanicked(err.to_string()))).is_err() {
                    debug!(%id, "Shared::dispatch: caller went away");
                }
            }
        }
    }

    fn complete(self: &Arc<Self>, mut job: Job<T>, result: Result<T::Response, TransportError>, started: Instant) {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);

        let err = match result {
            Ok(value) => {
                inner.window.record_admission(now);
                if let Some(key) = &job.descriptor.cache_key
                    && !inner.terminated
                {
                    inner.cache.set(key.clone(), value.clone(), job.descriptor.cache_ttl, now);
                }
                inner.stats.record_success(now.saturating_duration_since(started));
                drop(inner);
                debug!(id = %job.descriptor.id, "Shared::complete: success");
                job.resolve(Ok(value));
                return;
            }
            Err(err) => err,
        };

        if !err.is_rate_limit() {
            inner.stats.record_failure();
            drop(inner);
            debug!(id = %job.descriptor.id, error = %err, "Shared::complete: permanent failure");
            job.resolve(Err(SchedulerError::Request(err)));
            return;
        }

        inner.stats.rate_limited_requests += 1;
        let retry_after = err.retry_after();
        match self.retry.decide(job.descriptor.retry_count, retry_after) {
            RetryDecision::Retry { .. } if inner.terminated => {
                drop(inner);
                job.resolve(Err(SchedulerError::Terminated));
            }
            RetryDecision::Retry { delay } => {
                job.descriptor.retry_count += 1;
                inner.pending_retries += 1;
                drop(inner);
                warn!(
                    id = %job.descriptor.id,
                    retry_count = job.descriptor.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, scheduling retry"
                );
                self.schedule_retry(job, delay);
            }
            RetryDecision::Exhausted => {
                inner.stats.record_failure();
                drop(inner);
                let attempts = job.descriptor.retry_count + 1;
                warn!(id = %job.descriptor.id, attempts, "Rate limited, retries exhausted");
                job.resolve(Err(SchedulerError::RateLimited { attempts, retry_after }));
            }
        }
    }

    /// Re-enqueue `job` after `delay` without holding up the drain worker
    fn schedule_retry(self: &Arc<Self>, job: Job<T>, delay: Duration) {
        let shared = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let stopped = *shutdown_rx.borrow();
            if !stopped {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown_rx.changed() => {}
                }
            }

            shared.lock().pending_retries -= 1;
            // Lands at the tail of its priority class; rejected if shut down meanwhile
            shared.enqueue(job);
        });
    }

    fn spawn_safety_tick(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.config.queue_safety_tick();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.wake();
            }
        })
    }

    fn spawn_cache_sweep(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.config.cache_sweep_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = self.lock().cache.sweep(Instant::now());
                debug!(removed, "Shared::cache_sweep: tick");
            }
        })
    }
}

impl<T: Transport> SchedulerInner<T> {
    /// Idle -> Draining; returns whether the caller must spawn the worker
    fn begin_draining(&mut self) -> bool {
        if self.phase == Phase::Idle {
            self.phase = Phase::Draining;
            true
        } else {
            false
        }
    }
}
