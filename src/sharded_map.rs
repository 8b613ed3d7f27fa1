//! Lock-sharded concurrent map
//!
//! [`ShardedMap`] splits its key space over a fixed number of shards, each a
//! `HashMap` behind its own `parking_lot::RwLock`. A key is routed to shard
//! `hash(key) % num_shards`, so operations on keys in different shards never
//! contend, while operations within one shard follow the usual
//! many-readers/one-writer discipline.
//!
//! The shard count is fixed at construction. There is no resharding.
//!
//! # Examples
//!
//! ```
//! use prometheus_primitives::ShardedMap;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let map = Arc::new(ShardedMap::new(8, |k: &u64| k.wrapping_mul(0x9E37_79B9_7F4A_7C15)).unwrap());
//!
//! let handles: Vec<_> = (0..4u64)
//!     .map(|t| {
//!         let map = Arc::clone(&map);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 map.set(t * 1000 + i, i);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! assert_eq!(map.len(), 400);
//! assert_eq!(map.get(&2005), Some(5));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use tracing::debug;

use crate::core::PoolError;

/// Upper bound for [`default_shard_count`].
pub const MAX_DEFAULT_SHARDS: usize = 64;

/// Routes keys to shards.
///
/// Implementations must be deterministic for the lifetime of the map. Any
/// `Fn(&K) -> u64 + Send + Sync` closure implements this trait.
pub trait KeyHasher<K: ?Sized>: Send + Sync {
    /// Hash `key` to an unsigned integer.
    fn hash_key(&self, key: &K) -> u64;
}

impl<K: ?Sized, F> KeyHasher<K> for F
where
    F: Fn(&K) -> u64 + Send + Sync,
{
    fn hash_key(&self, key: &K) -> u64 {
        self(key)
    }
}

/// [`KeyHasher`] backed by an `ahash::RandomState`.
///
/// The state is seeded once, so routing is stable for the map that owns it
/// but differs between maps.
#[derive(Debug, Clone, Default)]
pub struct DefaultKeyHasher {
    state: ahash::RandomState,
}

impl DefaultKeyHasher {
    /// Creates a hasher with a fresh random seed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: Hash + ?Sized> KeyHasher<K> for DefaultKeyHasher {
    fn hash_key(&self, key: &K) -> u64 {
        BuildHasher::hash_one(&self.state, key)
    }
}

/// Shard count suited to this machine: four per logical CPU, rounded up to a
/// power of two and capped at [`MAX_DEFAULT_SHARDS`].
#[must_use]
pub fn default_shard_count() -> usize {
    num_cpus::get()
        .max(1)
        .saturating_mul(4)
        .next_power_of_two()
        .min(MAX_DEFAULT_SHARDS)
}

type Shard<K, V> = CachePadded<RwLock<HashMap<K, V, ahash::RandomState>>>;

/// A concurrent map partitioned into independently locked shards.
pub struct ShardedMap<K, V, H = DefaultKeyHasher> {
    shards: Box<[Shard<K, V>]>,
    hasher: H,
}

impl<K, V, H> fmt::Debug for ShardedMap<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedMap")
            .field("num_shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}

impl<K, V> ShardedMap<K, V, DefaultKeyHasher>
where
    K: Eq + Hash,
{
    /// Creates a map routed by a randomly seeded [`DefaultKeyHasher`].
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if `num_shards` is zero.
    pub fn with_default_hasher(num_shards: usize) -> Result<Self, PoolError> {
        Self::with_hasher(num_shards, DefaultKeyHasher::new())
    }
}

impl<K, V, F> ShardedMap<K, V, F>
where
    K: Eq + Hash,
    F: Fn(&K) -> u64 + Send + Sync,
{
    /// Creates a map with `num_shards` shards routed by `hash_fn`.
    ///
    /// `hash_fn` must be deterministic. A poorly distributed hash only skews
    /// shard load; it never affects correctness.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if `num_shards` is zero.
    pub fn new(num_shards: usize, hash_fn: F) -> Result<Self, PoolError> {
        Self::with_hasher(num_shards, hash_fn)
    }
}

impl<K, V, H> ShardedMap<K, V, H>
where
    K: Eq + Hash,
    H: KeyHasher<K>,
{
    /// Creates a map with `num_shards` shards routed by `hasher`.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if `num_shards` is zero.
    pub fn with_hasher(num_shards: usize, hasher: H) -> Result<Self, PoolError> {
        if num_shards == 0 {
            return Err(PoolError::InvalidConfig(
                "num_shards must be greater than 0".into(),
            ));
        }

        let shards = (0..num_shards)
            .map(|_| CachePadded::new(RwLock::new(HashMap::default())))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        debug!(num_shards = num_shards, "ShardedMap initialized");

        Ok(Self { shards, hasher })
    }

    /// Number of shards, fixed at construction.
    #[must_use]
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard that owns `key`.
    #[must_use]
    // The remainder is below `shards.len()`, so it fits in usize.
    #[allow(clippy::cast_possible_truncation)]
    pub fn shard_index(&self, key: &K) -> usize {
        (self.hasher.hash_key(key) % self.shards.len() as u64) as usize
    }

    #[inline]
    fn shard(&self, key: &K) -> &RwLock<HashMap<K, V, ahash::RandomState>> {
        &self.shards[self.shard_index(key)]
    }

    /// Returns a clone of the value for `key`.
    ///
    /// Holds the shard's read lock only for the lookup.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.shard(key).read().get(key).cloned()
    }

    /// Applies `f` to the value for `key` under the shard's read lock.
    ///
    /// `f` must not call back into this map's write operations for a key in
    /// the same shard.
    pub fn get_with<T>(&self, key: &K, f: impl FnOnce(&V) -> T) -> Option<T> {
        self.shard(key).read().get(key).map(f)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Inserts or overwrites `key`, returning the previous value.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.shard(&key).write().insert(key, value)
    }

    /// Removes `key`, returning its value. Absent keys are a no-op.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.shard(key).write().remove(key)
    }

    /// Total number of entries.
    ///
    /// Shards are read one at a time, so under concurrent writes the result
    /// is not a point-in-time snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Returns `true` if every shard is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Removes every entry, one shard at a time.
    pub fn clear(&self) {
        for shard in &*self.shards {
            shard.write().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_shards_rejected() {
        let result = ShardedMap::<u64, u64, _>::new(0, |k: &u64| *k);
        assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
    }

    #[test]
    fn test_routing_uses_hash_modulo() {
        let map = ShardedMap::<u64, (), _>::new(4, |k: &u64| *k).unwrap();
        assert_eq!(map.num_shards(), 4);
        assert_eq!(map.shard_index(&0), 0);
        assert_eq!(map.shard_index(&5), 1);
        assert_eq!(map.shard_index(&7), 3);
    }

    #[test]
    fn test_constant_hash_still_correct() {
        // Everything lands in one shard; behaviour must not change.
        let map = ShardedMap::new(8, |_: &String| 42_u64).unwrap();
        map.set("a".to_string(), 1);
        map.set("b".to_string(), 2);
        assert_eq!(map.get(&"a".to_string()), Some(1));
        assert_eq!(map.get(&"b".to_string()), Some(2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_set_returns_previous() {
        let map = ShardedMap::with_default_hasher(4).unwrap();
        assert_eq!(map.set("k", 1), None);
        assert_eq!(map.set("k", 2), Some(1));
        assert_eq!(map.delete(&"k"), Some(2));
        assert_eq!(map.delete(&"k"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_get_with_borrows() {
        let map = ShardedMap::with_default_hasher(2).unwrap();
        map.set(1, vec![1, 2, 3]);
        assert_eq!(map.get_with(&1, Vec::len), Some(3));
        assert_eq!(map.get_with(&2, Vec::len), None);
    }

    #[test]
    fn test_clear() {
        let map = ShardedMap::with_default_hasher(4).unwrap();
        for i in 0..32 {
            map.set(i, i);
        }
        assert_eq!(map.len(), 32);
        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains_key(&3));
    }

    #[test]
    fn test_default_shard_count_bounds() {
        let count = default_shard_count();
        assert!(count >= 4);
        assert!(count <= MAX_DEFAULT_SHARDS);
        assert!(count.is_power_of_two());
    }
}
