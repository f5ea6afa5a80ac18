//! Shared cache of compiled patterns.
//!
//! Lookups are lock-free: the map lives behind an [`ArcSwap`] and readers
//! only load the current snapshot. Inserting copies the map, adds the new
//! entry and swaps the copy in. Writers are serialized by a mutex so two
//! threads compiling different patterns never lose each other's entries.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::PinyinRegexError;
use crate::PinyinRegex;

/// Entries kept before the cache starts over.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

type Snapshot = FxHashMap<String, Arc<PinyinRegex>>;

/// Pattern text -> compiled pattern.
///
/// Failed compilations are not cached.
pub struct PatternCache {
    compiled: ArcSwap<Snapshot>,
    build_lock: Mutex<()>,
    capacity: usize,
}

impl std::fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// A cache holding at most `capacity` patterns. When full, the next
    /// insertion drops every existing entry.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            compiled: ArcSwap::from_pointee(Snapshot::default()),
            build_lock: Mutex::new(()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.compiled.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.load().is_empty()
    }

    /// Look up a pattern without compiling it.
    pub fn get(&self, pattern: &str) -> Option<Arc<PinyinRegex>> {
        self.compiled.load().get(pattern).cloned()
    }

    /// Return the compiled pattern, compiling and storing it on a miss.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<PinyinRegex>, PinyinRegexError> {
        if let Some(hit) = self.get(pattern) {
            tracing::debug!(pattern, "pattern cache hit");
            return Ok(hit);
        }

        let _guard = self.build_lock.lock();
        // another writer may have compiled it while we waited
        if let Some(hit) = self.get(pattern) {
            tracing::debug!(pattern, "pattern cache hit after wait");
            return Ok(hit);
        }

        tracing::debug!(pattern, "pattern cache miss");
        let regex = Arc::new(PinyinRegex::new(pattern)?);

        let current = self.compiled.load();
        let mut next = if current.len() >= self.capacity {
            tracing::debug!(evicted = current.len(), "pattern cache full, starting over");
            Snapshot::default()
        } else {
            (**current).clone()
        };
        next.insert(pattern.to_string(), Arc::clone(&regex));
        self.compiled.store(Arc::new(next));
        Ok(regex)
    }

    pub fn clear(&self) {
        let _guard = self.build_lock.lock();
        self.compiled.store(Arc::new(Snapshot::default()));
    }
}
