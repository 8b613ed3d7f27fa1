//! Error types for primitive construction and worker pool admission.

use thiserror::Error;

/// Errors produced by the primitives in this crate.
///
/// Lookups never fail (a miss is `None`), so these only surface at construction
/// time and on the worker pool's submission path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Construction parameters were rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The pool has started closing and accepts no more jobs.
    #[error("pool has been shut down")]
    PoolShutdown,
    /// The job queue is full (non-blocking submission only).
    #[error("job queue is full")]
    QueueFull,
    /// A bounded wait expired.
    #[error("operation timed out")]
    Timeout,
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}
