//! Typed configuration values for the primitives.

pub mod pool;

pub use pool::{WorkerPoolConfig, MIN_STACK_SIZE};
