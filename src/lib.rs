//! # Prometheus Primitives
//!
//! Three independent building blocks for services on the Prometheus AI Platform:
//!
//! - [`LruCache`] - fixed-capacity, single-threaded cache with least-recently-used eviction
//! - [`ShardedMap`] - concurrent map split into independently locked shards
//! - [`WorkerPool`](core::WorkerPool) - fixed set of OS threads applying one transform
//!   to a bounded stream of jobs
//!
//! None of them depends on another, and none keeps process-wide state: every
//! instance owns everything it uses.
//!
//! ## LruCache
//!
//! ```
//! use prometheus_primitives::LruCache;
//!
//! let mut cache = LruCache::new(2);
//! cache.put(1, "a");
//! cache.put(2, "b");
//! cache.get(&1);
//! cache.put(3, "c"); // evicts 2
//! assert_eq!(cache.get(&2), None);
//! assert_eq!(cache.len(), 2);
//! ```
//!
//! ## ShardedMap
//!
//! ```
//! use prometheus_primitives::ShardedMap;
//!
//! let map = ShardedMap::with_default_hasher(16).unwrap();
//! map.set("model", "llama");
//! assert_eq!(map.get(&"model"), Some("llama"));
//! map.delete(&"model");
//! assert_eq!(map.get(&"model"), None);
//! ```
//!
//! ## WorkerPool
//!
//! ```
//! use prometheus_primitives::core::WorkerPool;
//!
//! // Fallible transforms report failure through their result type.
//! let pool = WorkerPool::new(2, |s: String| s.parse::<i64>()).unwrap();
//! let results = pool.results();
//!
//! pool.submit("42".to_string()).unwrap();
//! pool.submit("nope".to_string()).unwrap();
//! pool.close();
//!
//! let (ok, err): (Vec<_>, Vec<_>) = results.partition(Result::is_ok);
//! assert_eq!(ok.len(), 1);
//! assert_eq!(err.len(), 1);
//! ```
//!
//! For complete examples, see:
//! - `tests/worker_pool_test.rs` - backpressure and drain behaviour
//! - `tests/sharded_map_test.rs` - multi-threaded map usage

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Configuration values for the worker pool.
pub mod config;
/// Worker pool and shared error type.
pub mod core;
/// Bounded LRU cache.
pub mod lru;
/// Lock-sharded concurrent map.
pub mod sharded_map;
/// Shared utilities.
pub mod util;

pub use crate::core::{PoolError, Results, WorkerPool};
pub use config::WorkerPoolConfig;
pub use lru::LruCache;
pub use sharded_map::{default_shard_count, DefaultKeyHasher, KeyHasher, ShardedMap};
