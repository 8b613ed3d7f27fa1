//! Bounded least-recently-used cache
//!
//! [`LruCache`] is a fixed-capacity key/value store that evicts the least
//! recently used entry when a new key would exceed its capacity.
//!
//! Entries live in a `generational_arena::Arena` linked into a doubly-linked
//! recency list (head = most recently used, tail = least recently used). A
//! `HashMap` from key to arena index gives O(1) lookup.
//!
//! # Thread safety
//!
//! The cache has no internal locking. Every operation that can change the
//! recency order, `get` included, takes `&mut self`, so the borrow checker
//! rejects unsynchronized sharing. Wrap it in a [`Mutex`](parking_lot::Mutex)
//! if several threads need it.
//!
//! # Examples
//!
//! ```
//! use prometheus_primitives::LruCache;
//!
//! let mut cache = LruCache::new(2);
//! cache.put(1, "a");
//! cache.put(2, "b");
//! assert_eq!(cache.get(&1), Some(&"a"));
//!
//! // Key 2 is now the least recently used.
//! assert_eq!(cache.put(3, "c"), Some((2, "b")));
//! assert_eq!(cache.get(&2), None);
//! assert_eq!(cache.get(&3), Some(&"c"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use generational_arena::{Arena, Index};

struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<Index>,
    next: Option<Index>,
}

/// A fixed-capacity cache with least-recently-used eviction.
///
/// A capacity of `0` yields a no-op cache: [`put`](Self::put) hands every entry
/// straight back as evicted and the cache stays empty.
pub struct LruCache<K, V> {
    capacity: usize,
    nodes: Arena<Node<K, V>>,
    lookup: HashMap<K, Index>,
    head: Option<Index>,
    tail: Option<Index>,
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.lookup.len())
            .finish()
    }
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            nodes: Arena::new(),
            lookup: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live entries, never more than [`capacity`](Self::capacity).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Returns `true` if `key` is cached. Does not change the recency order.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.lookup.contains_key(key)
    }

    /// Looks up `key` and marks it most recently used on a hit.
    ///
    /// A miss has no side effects.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let index = *self.lookup.get(key)?;
        self.promote(index);
        self.nodes.get(index).map(|node| &node.value)
    }

    /// Like [`get`](Self::get), but returns a mutable reference.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = *self.lookup.get(key)?;
        self.promote(index);
        self.nodes.get_mut(index).map(|node| &mut node.value)
    }

    /// Looks up `key` without touching the recency order.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        let index = *self.lookup.get(key)?;
        self.nodes.get(index).map(|node| &node.value)
    }

    /// Inserts or overwrites `key` and marks it most recently used.
    ///
    /// Overwriting an existing key never evicts. Inserting a new key into a
    /// full cache first evicts the least recently used entry, which is
    /// returned.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&index) = self.lookup.get(&key) {
            if let Some(node) = self.nodes.get_mut(index) {
                node.value = value;
            }
            self.promote(index);
            return None;
        }

        if self.capacity == 0 {
            return Some((key, value));
        }

        let evicted = if self.lookup.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        let index = self.nodes.insert(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.lookup.insert(key, index);
        self.push_front(index);
        evicted
    }

    /// Removes `key`, returning its value if it was cached.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.lookup.remove(key)?;
        self.unlink(index);
        self.nodes.remove(index).map(|node| node.value)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let index = self.tail?;
        self.unlink(index);
        let node = self.nodes.remove(index)?;
        self.lookup.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Removes every entry. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lookup.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterates entries from most to least recently used without promoting them.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            cursor: self.head,
            remaining: self.lookup.len(),
        }
    }

    fn promote(&mut self, index: Index) {
        if self.head != Some(index) {
            self.unlink(index);
            self.push_front(index);
        }
    }

    // Detaches a node from the list. Arena and lookup entries are left alone.
    fn unlink(&mut self, index: Index) {
        let Some(node) = self.nodes.get(index) else {
            return;
        };
        let (prev, next) = (node.prev, node.next);

        match prev {
            Some(prev) => {
                if let Some(prev_node) = self.nodes.get_mut(prev) {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next) => {
                if let Some(next_node) = self.nodes.get_mut(next) {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, index: Index) {
        let old_head = self.head;
        if let Some(node) = self.nodes.get_mut(index) {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(old) = old_head.and_then(|old| self.nodes.get_mut(old)) {
            old.prev = Some(index);
        }
        self.head = Some(index);
        if self.tail.is_none() {
            self.tail = Some(index);
        }
    }
}

/// Iterator over cache entries in most-to-least recently used order.
///
/// Created by [`LruCache::iter`].
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<Node<K, V>>,
    cursor: Option<Index>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.get(self.cursor?)?;
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
