//! Bounded worker pool backed by dedicated OS threads.
//!
//! A `WorkerPool<T, R>` starts a fixed number of worker threads, each applying
//! the same transform `Fn(T) -> R` to jobs pulled from a bounded job queue and
//! pushing the output onto a bounded result queue. Both queues default to a
//! capacity of twice the worker count.
//!
//! # Key Features
//!
//! - **Backpressure**: `submit` blocks while the job queue is full; workers block
//!   while the result queue is full
//! - **Drain on close**: `close` waits for every accepted job to produce its
//!   result, then ends the result stream
//! - **Completion order**: results arrive in the order workers finish, not in
//!   submission order
//! - **No result inspection**: a fallible transform encodes failure in `R`
//!
//! # Example
//!
//! ```
//! use prometheus_primitives::core::WorkerPool;
//! use std::thread;
//!
//! let pool = WorkerPool::new(4, |n: u64| n * n).unwrap();
//!
//! let results = pool.results();
//! let consumer = thread::spawn(move || results.sum::<u64>());
//!
//! for n in 1..=10 {
//!     pool.submit(n).unwrap();
//! }
//! pool.close();
//!
//! assert_eq!(consumer.join().unwrap(), 385);
//! ```

mod native;

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::core::PoolError;

pub use native::WorkerPool;

/// Consuming view over a pool's result stream.
///
/// Iteration blocks while the pool is open and no result is ready, and ends
/// once the pool has been closed (or dropped) and every result has been taken.
/// Handles obtained from the same pool share one stream: each result is
/// yielded by exactly one of them.
#[derive(Debug)]
pub struct Results<R> {
    rx: Receiver<R>,
}

impl<R> Results<R> {
    pub(crate) fn new(rx: Receiver<R>) -> Self {
        Self { rx }
    }

    /// Takes a result if one is ready, without blocking.
    pub fn try_next(&mut self) -> Option<R> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next result.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Timeout` if no result arrived in time.
    pub fn next_timeout(&mut self, timeout: Duration) -> Result<Option<R>, PoolError> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Ok(Some(result)),
            Err(RecvTimeoutError::Timeout) => Err(PoolError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    /// Number of results waiting to be consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl<R> Iterator for Results<R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        self.rx.recv().ok()
    }
}
