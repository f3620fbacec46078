//! Bounded LRU cache of converted documents.
//!
//! Keys hash the input text together with the registry generation, so a
//! `register`/`unregister` makes earlier entries unreachable instead of stale.

use adfmark_core::Document;
use log::debug;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Content hash of an input and the plugin set it was converted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Hashes `generation` (little-endian) followed by the text bytes.
    pub fn new(text: &str, generation: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&generation.to_le_bytes());
        hasher.update(text.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[derive(Debug)]
struct CacheEntry {
    doc: Document,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: FxHashMap<CacheKey, CacheEntry>,
    tick: u64,
}

impl CacheInner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!("evicted least recently used document");
        }
    }
}

/// Thread-safe document cache. A capacity of 0 disables it.
#[derive(Debug)]
pub struct DocumentCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl DocumentCache {
    /// Creates a cache holding at most `capacity` documents.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether lookups can ever hit.
    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Returns a copy of the cached document and marks it recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Document> {
        if !self.is_enabled() {
            return None;
        }
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        let entry = inner.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.doc.clone())
    }

    /// Stores a document, evicting the least recently used entry when full.
    pub fn insert(&self, key: CacheKey, doc: Document) {
        if !self.is_enabled() {
            return;
        }
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            inner.evict_oldest();
        }
        inner.entries.insert(
            key,
            CacheEntry {
                doc,
                last_used: tick,
            },
        );
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }
}
