//! Worker pool and the error type shared by every primitive.

pub mod error;
pub mod worker_pool;

pub use error::PoolError;
pub use worker_pool::{Results, WorkerPool};
