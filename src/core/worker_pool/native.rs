//! Native implementation of `WorkerPool` using OS threads.
//!
//! # Design Principles
//!
//! - **No polling**: workers block on channel `recv`, producers block on `send`
//! - **Clean shutdown**: dropping the last job sender ends every worker loop
//! - **Result stream ownership**: only workers hold result senders, so the
//!   stream ends exactly when the last worker exits

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::PoolError;

use super::Results;

/// Fixed-size pool of worker threads applying one transform to submitted jobs.
///
/// # Design
///
/// - Job queue and result queue are bounded `crossbeam_channel`s
/// - `close` drops the job sender and joins every worker before returning
/// - Dropping the pool without `close` detaches the workers instead
pub struct WorkerPool<T, R> {
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Job sender. `None` once closing has begun.
    job_tx: Mutex<Option<Sender<T>>>,

    /// Result receiver, cloned into every `Results` handle.
    result_rx: Receiver<R>,

    /// Worker thread handles, drained by `close`.
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Set as soon as closing begins.
    closed: AtomicBool,
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Create a pool of `worker_count` threads running `transform`.
    ///
    /// Both queues get a capacity of `2 × worker_count`.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if `worker_count` is zero
    /// - `PoolError::Spawn` if a worker thread could not be started
    pub fn new<F>(worker_count: usize, transform: F) -> Result<Self, PoolError>
    where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        Self::with_config(
            WorkerPoolConfig::new().with_worker_count(worker_count),
            transform,
        )
    }

    /// Create a pool from an explicit configuration.
    ///
    /// Workers start immediately.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a worker thread could not be started
    pub fn with_config<F>(config: WorkerPoolConfig, transform: F) -> Result<Self, PoolError>
    where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let capacity = config.effective_queue_capacity();
        let (job_tx, job_rx) = bounded::<T>(capacity);
        let (result_tx, result_rx) = bounded::<R>(capacity);
        let transform = Arc::new(transform);

        let mut workers = Vec::with_capacity(config.worker_count);

        for worker_id in 0..config.worker_count {
            let spawned = spawn_worker(
                worker_id,
                &config,
                job_rx.clone(),
                result_tx.clone(),
                Arc::clone(&transform),
            );
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(worker_id = worker_id, error = %e, "Failed to spawn worker thread");
                    // Started workers see a disconnected job queue and exit.
                    drop(job_tx);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(e.to_string()));
                }
            }
        }

        // Workers own the only result senders from here on.
        drop(result_tx);

        info!(
            worker_count = config.worker_count,
            queue_capacity = capacity,
            "WorkerPool initialized with dedicated OS threads"
        );

        Ok(Self {
            config,
            job_tx: Mutex::new(Some(job_tx)),
            result_rx,
            workers: Mutex::new(workers),
            closed: AtomicBool::new(false),
        })
    }

    /// Submit a job, blocking while the job queue is full.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::PoolShutdown` if closing has begun or every worker
    /// has died.
    pub fn submit(&self, job: T) -> Result<(), PoolError> {
        let job_tx = self.sender()?;
        job_tx.send(job).map_err(|_| PoolError::PoolShutdown)
    }

    /// Submit a job without blocking.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` if the job queue is full
    /// - `PoolError::PoolShutdown` if closing has begun
    pub fn try_submit(&self, job: T) -> Result<(), PoolError> {
        let job_tx = self.sender()?;
        match job_tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Worker pool job queue is full");
                Err(PoolError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(PoolError::PoolShutdown),
        }
    }

    /// Submit a job, waiting at most `timeout` for queue space.
    ///
    /// # Errors
    ///
    /// - `PoolError::Timeout` if no space freed up in time
    /// - `PoolError::PoolShutdown` if closing has begun
    pub fn submit_timeout(&self, job: T, timeout: Duration) -> Result<(), PoolError> {
        let job_tx = self.sender()?;
        match job_tx.send_timeout(job, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(PoolError::Timeout),
            Err(SendTimeoutError::Disconnected(_)) => Err(PoolError::PoolShutdown),
        }
    }

    /// A handle on the result stream.
    ///
    /// Results are yielded in completion order. The stream ends after
    /// [`close`](Self::close) has drained every worker.
    #[must_use]
    pub fn results(&self) -> Results<R> {
        Results::new(self.result_rx.clone())
    }

    /// Stop accepting jobs and wait for every queued job to be processed.
    ///
    /// Returns once all workers have exited, at which point the result stream
    /// ends after its remaining results are consumed. Calling `close` again, or
    /// from several threads, waits for the same drain.
    ///
    /// Blocks indefinitely if nobody consumes results and the result queue is
    /// full.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Closing worker pool");
        }

        // Workers exit once the queue is empty and the last sender is gone.
        self.job_tx.lock().take();

        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (worker_id, worker) in workers.drain(..).enumerate() {
            match worker.join() {
                Ok(()) => debug!(worker_id = worker_id, "Worker joined successfully"),
                Err(_) => warn!(worker_id = worker_id, "Worker panicked"),
            }
        }

        if worker_count > 0 {
            info!(worker_count = worker_count, "Worker pool closed");
        }
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Capacity of the job queue and of the result queue.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.config.effective_queue_capacity()
    }

    /// Jobs waiting to be picked up by a worker.
    #[must_use]
    pub fn queued_jobs(&self) -> usize {
        self.job_tx.lock().as_ref().map_or(0, Sender::len)
    }

    /// Returns `true` once closing has begun.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // Clone the sender so a blocked send does not hold the lock.
    fn sender(&self) -> Result<Sender<T>, PoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }
        self.job_tx
            .lock()
            .as_ref()
            .cloned()
            .ok_or(PoolError::PoolShutdown)
    }
}

impl<T, R> Drop for WorkerPool<T, R> {
    fn drop(&mut self) {
        // No join here; explicit close() is required for a graceful drain.
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.job_tx.lock().take();
            debug!("WorkerPool dropped without close - workers will be detached");
        }
    }
}

/// Spawn a worker thread.
fn spawn_worker<T, R, F>(
    worker_id: usize,
    config: &WorkerPoolConfig,
    job_rx: Receiver<T>,
    result_tx: Sender<R>,
    transform: Arc<F>,
) -> io::Result<JoinHandle<()>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    thread::Builder::new()
        .name(format!("{}-{worker_id}", config.thread_name_prefix))
        .stack_size(config.thread_stack_size)
        .spawn(move || {
            debug!(worker_id = worker_id, "Worker thread started");

            // Ends when the queue is empty and every sender is dropped.
            for job in &job_rx {
                let result = (*transform)(job);

                if result_tx.send(result).is_err() {
                    debug!(worker_id = worker_id, "Result stream dropped, exiting");
                    break;
                }
            }

            debug!(worker_id = worker_id, "Worker thread exiting");
        })
}
