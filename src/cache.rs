// src/cache.rs
// =============================================================================
// A bounded least-recently-used (LRU) cache.
//
// The crawler keeps raw page bodies here so the same URL is never fetched
// twice while it's still "hot". When the cache is full, the entry that was
// touched longest ago gets evicted.
//
// How it works:
// - Entries live in a Vec ("slab") and are chained into a doubly linked list
//   by index. The head of the list is the most recently used entry, the tail
//   is the least recently used one.
// - A HashMap maps each key to its slot in the slab, so lookups are O(1).
// - Moving an entry to the front or unlinking the tail is also O(1).
// - Slots freed by eviction are reused by the next insert.
//
// Every worker shares one cache, so the whole structure sits behind a Mutex.
// The lock is only held while the map and list are rearranged, never while
// we wait on the network.
//
// Rust concepts:
// - Generics: LruCache<K, V> works for any hashable key
// - Mutex: interior mutability shared across threads
// - Option<usize>: "pointer or nothing" without unsafe code
// =============================================================================

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

// One slot in the slab
#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

// The unsynchronized part: map + list. Only ever touched under the lock.
#[derive(Debug)]
struct Inner<K, V> {
    map: HashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    head: Option<usize>, // most recently used
    tail: Option<usize>, // least recently used
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
{
    // Detaches a node from the list, leaving its slot in place
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = &self.nodes[idx];
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }

        self.nodes[idx].prev = None;
        self.nodes[idx].next = None;
    }

    // Links a detached node in at the head (most recently used)
    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = None;
        self.nodes[idx].next = self.head;

        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(idx);
        }
        self.head = Some(idx);

        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.unlink(idx);
            self.push_front(idx);
        }
    }
}

// Bounded LRU cache, safe to share between workers (wrap it in an Arc)
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: NonZeroUsize,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // Creates an empty cache that holds at most `capacity` entries
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                map: HashMap::with_capacity(capacity.get()),
                nodes: Vec::with_capacity(capacity.get()),
                head: None,
                tail: None,
            }),
        }
    }

    // A poisoned lock only means another worker panicked mid-crawl.
    // The map and list are always left consistent between statements that
    // can panic, so we keep going with whatever is inside.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Looks up a key.
    //
    // On a hit the entry becomes the most recently used one and a clone of
    // the value is returned. A miss changes nothing.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let idx = *inner.map.get(key)?;
        inner.touch(idx);
        Some(inner.nodes[idx].value.clone())
    }

    // Inserts or updates a key, marking it most recently used.
    //
    // Updating an existing key never changes the size. Inserting a new key
    // into a full cache evicts exactly one entry: the least recently used.
    pub fn set(&self, key: K, value: V) {
        let mut inner = self.lock();

        if let Some(&idx) = inner.map.get(&key) {
            inner.nodes[idx].value = value;
            inner.touch(idx);
            return;
        }

        if inner.map.len() >= self.capacity.get() {
            // Full: recycle the tail's slot for the new entry
            if let Some(tail) = inner.tail {
                inner.unlink(tail);
                let old_key = inner.nodes[tail].key.clone();
                inner.map.remove(&old_key);
                inner.nodes[tail].key = key.clone();
                inner.nodes[tail].value = value;
                inner.map.insert(key, tail);
                inner.push_front(tail);
                return;
            }
        }

        let idx = inner.nodes.len();
        inner.nodes.push(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        inner.map.insert(key, idx);
        inner.push_front(idx);
    }

    // Checks for a key without refreshing its recency
    #[cfg(test)]
    pub fn contains(&self, key: &K) -> bool {
        self.lock().map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    // Keys from most to least recently used
    #[cfg(test)]
    pub fn keys(&self) -> Vec<K> {
        let inner = self.lock();
        let mut keys = Vec::with_capacity(inner.map.len());
        let mut cursor = inner.head;
        while let Some(idx) = cursor {
            keys.push(inner.nodes[idx].key.clone());
            cursor = inner.nodes[idx].next;
        }
        keys
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why not a linked list of Box<Node>?
//    - A doubly linked list needs two owners per node (prev and next)
//    - Rust's ownership rules make that awkward without Rc<RefCell<...>>
//      or unsafe pointers
//    - Storing nodes in a Vec and linking them by index sidesteps all of
//      that: indices are just numbers, and the Vec owns every node
//
// 2. Why does get() take &self and not &mut self?
//    - The cache is shared by many workers through an Arc
//    - Arc only hands out shared references (&T)
//    - The Mutex inside gives us mutable access when we need it
//      ("interior mutability")
//
// 3. Why return a clone from get()?
//    - We can't hand out a reference into the map: the lock is released
//      as soon as get() returns
//    - The crawler stores Arc<str> values, so the "clone" is just a
//      reference count bump, not a copy of the page
// -----------------------------------------------------------------------------
