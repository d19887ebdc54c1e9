//! LRU Store Module
//!
//! Fixed-capacity store ordered by recency of use.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{Clock, Entry, RemovalCause, RemovalNotifier, Store, SystemClock, Sweep};
use crate::error::{CacheError, Result};

/// Upper bound on removals performed by one `sweep_expired` call.
///
/// Whatever is left is picked up by the next sweep; reads and capacity
/// eviction keep stale entries invisible and bounded in the meantime.
pub const MAX_SWEEP_REMOVALS: usize = 10_000;

// == Recency List ==
struct Node<K, V> {
    key: K,
    entry: Entry<V>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Hash index over a slab of doubly-linked nodes.
///
/// - `head` = Most recently used
/// - `tail` = Least recently used
struct RecencyList<K, V> {
    index: HashMap<K, usize>,
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K: Eq + Hash + Clone, V> RecencyList<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn node(&self, idx: usize) -> &Node<K, V> {
        self.slots[idx].as_ref().expect("indexed slot holds a node")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        self.slots[idx].as_mut().expect("indexed slot holds a node")
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    // == Touch ==
    /// Moves a node to the most recently used position.
    fn promote(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.unlink(idx);
            self.link_front(idx);
        }
    }

    fn push_front(&mut self, key: K, entry: Entry<V>) {
        let node = Node {
            key: key.clone(),
            entry,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.link_front(idx);
    }

    fn take(&mut self, idx: usize) -> (K, Entry<V>) {
        self.unlink(idx);
        let node = self.slots[idx].take().expect("indexed slot holds a node");
        self.index.remove(&node.key);
        self.free.push(idx);
        (node.key, node.entry)
    }

    fn remove(&mut self, key: &K) -> Option<(K, Entry<V>)> {
        let idx = self.index.get(key).copied()?;
        Some(self.take(idx))
    }

    // == Evict Oldest ==
    fn pop_back(&mut self) -> Option<(K, Entry<V>)> {
        let idx = self.tail?;
        Some(self.take(idx))
    }

    fn drain(&mut self) -> Vec<(K, Entry<V>)> {
        let old = std::mem::replace(self, Self::new());
        old.slots
            .into_iter()
            .flatten()
            .map(|node| (node.key, node.entry))
            .collect()
    }

    /// Walks from most to least recently used.
    fn iter(&self) -> impl Iterator<Item = &Node<K, V>> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.node(cursor?);
            cursor = node.next;
            Some(node)
        })
    }
}

// == LRU Store ==
/// Store holding at most `capacity` entries.
///
/// A single mutex guards the whole structure; `get` takes it too since it
/// moves the entry to the front of the recency list.
pub struct LruStore<K, V> {
    inner: Mutex<RecencyList<K, V>>,
    capacity: usize,
    sweep_limit: usize,
    clock: Arc<dyn Clock>,
    notifier: RemovalNotifier<K, V>,
}

impl<K, V> LruStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    // == Constructor ==
    /// Creates a store holding at most `capacity` entries.
    ///
    /// Fails with [`CacheError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity);
        }

        Ok(Self {
            inner: Mutex::new(RecencyList::new()),
            capacity,
            sweep_limit: MAX_SWEEP_REMOVALS,
            clock: Arc::new(SystemClock),
            notifier: RemovalNotifier::none(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: RemovalNotifier<K, V>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Caps how many expired entries a single sweep removes.
    pub fn with_sweep_limit(mut self, limit: usize) -> Self {
        self.sweep_limit = limit.max(1);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys from most to least recently used, expired ones included.
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.inner.lock().iter().map(|node| node.key.clone()).collect()
    }
}

impl<K, V> Store<K, V> for LruStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Entry<V>> {
        let mut inner = self.inner.lock();
        let idx = inner.index.get(key).copied()?;
        inner.promote(idx);
        Some(inner.node(idx).entry.clone())
    }

    fn put(&self, key: K, entry: Entry<V>) {
        let mut inner = self.inner.lock();

        if let Some(idx) = inner.index.get(&key).copied() {
            // Overwrite: new entry, recency reset, no capacity check
            let old = std::mem::replace(&mut inner.node_mut(idx).entry, entry);
            inner.promote(idx);
            drop(inner);

            self.notifier.notify(&key, old.value(), RemovalCause::Replaced);
            return;
        }

        inner.push_front(key, entry);
        let evicted = if inner.len() > self.capacity {
            inner.pop_back()
        } else {
            None
        };
        drop(inner);

        if let Some((key, old)) = evicted {
            self.notifier.notify(&key, old.value(), RemovalCause::Capacity);
        }
    }

    fn remove(&self, key: &K) -> Option<Entry<V>> {
        let (key, entry) = self.inner.lock().remove(key)?;
        self.notifier.notify(&key, entry.value(), RemovalCause::Explicit);
        Some(entry)
    }

    fn remove_expired(&self, key: &K) -> Option<Entry<V>> {
        let now = self.clock.now();
        let removed = {
            let mut inner = self.inner.lock();
            let idx = inner.index.get(key).copied()?;
            if !inner.node(idx).entry.is_expired(now) {
                return None;
            }
            inner.take(idx)
        };

        self.notifier.notify(&removed.0, removed.1.value(), RemovalCause::Expired);
        Some(removed.1)
    }

    fn clear(&self) {
        let removed = self.inner.lock().drain();
        self.notifier.notify_all(removed, RemovalCause::Cleared);
    }

    fn count(&self) -> usize {
        self.inner.lock().len()
    }

    fn iterate(&self, visitor: &mut dyn FnMut(&K, &V) -> bool) {
        let now = self.clock.now();
        let snapshot: Vec<(K, V)> = self
            .inner
            .lock()
            .iter()
            .filter(|node| !node.entry.is_expired(now))
            .map(|node| (node.key.clone(), node.entry.value().clone()))
            .collect();

        for (key, value) in &snapshot {
            if !visitor(key, value) {
                break;
            }
        }
    }
}

impl<K, V> Sweep for LruStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = Vec::new();

        {
            let mut inner = self.inner.lock();
            let mut cursor = inner.tail;
            while let Some(idx) = cursor {
                if removed.len() >= self.sweep_limit {
                    break;
                }
                let node = inner.node(idx);
                cursor = node.prev;
                if node.entry.is_expired(now) {
                    removed.push(inner.take(idx));
                }
            }
        }

        let count = removed.len();
        self.notifier.notify_all(removed, RemovalCause::Expired);
        count
    }
}

impl<K, V> fmt::Debug for LruStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruStore")
            .field("capacity", &self.capacity)
            .field("len", &self.inner.lock().index.len())
            .finish()
    }
}
