//! Bounded LRU index of artifacts with deletion protection
//!
//! The index maps fingerprints to artifact locations and never holds more
//! than `capacity` entries. When a new key arrives at capacity the least
//! recently used entry always leaves the index, but its artifact is only
//! handed to the [`EvictionHandler`] if nobody currently protects that
//! fingerprint. A protected entry can therefore fall out of the index while
//! its file stays on disk; the transcoder's disk probe re-indexes it on the
//! next request.

use crate::job::Fingerprint;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Destructive side effect of an eviction.
///
/// Called with the cache mutex held, so implementations must not call back
/// into the cache.
pub trait EvictionHandler: Send + Sync {
    fn on_evict(&self, fingerprint: &Fingerprint, location: &Path);
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently indexed
    pub entries: usize,
    /// Configured bound
    pub capacity: usize,
    /// Fingerprints with at least one active protection
    pub protected: usize,
    /// Entries dropped from the index since creation
    pub evictions: u64,
    /// Evictions whose artifact was spared because it was protected
    pub spared: u64,
}

struct Inner {
    index: LruCache<Fingerprint, PathBuf>,
    /// Active protection count per fingerprint
    protected: HashMap<Fingerprint, usize>,
    evictions: u64,
    spared: u64,
}

/// LRU artifact index with per-fingerprint deletion protection
pub struct ProtectedLruCache {
    capacity: NonZeroUsize,
    inner: Mutex<Inner>,
    handler: Arc<dyn EvictionHandler>,
}

impl ProtectedLruCache {
    /// Create a cache bounded to `capacity` entries (at least one)
    pub fn new(capacity: usize, handler: Arc<dyn EvictionHandler>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                index: LruCache::new(capacity),
                protected: HashMap::new(),
                evictions: 0,
                spared: 0,
            }),
            handler,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up an artifact, marking it most recently used
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<PathBuf> {
        self.lock().index.get(fingerprint).cloned()
    }

    /// Insert or update an entry and mark it most recently used.
    ///
    /// Inserting a new key at capacity evicts the least recently used entry.
    pub fn put(&self, fingerprint: Fingerprint, location: PathBuf) {
        let mut inner = self.lock();

        if inner.index.contains(&fingerprint) {
            inner.index.put(fingerprint, location);
            return;
        }

        // The key is new, so anything handed back is the evicted LRU entry
        let Some((victim, victim_location)) = inner.index.push(fingerprint, location) else {
            return;
        };

        inner.evictions += 1;
        if inner.protected.contains_key(&victim) {
            inner.spared += 1;
            info!(
                "Evicted protected {} from index, keeping {}",
                victim.short(),
                victim_location.display()
            );
        } else {
            debug!("Evicting {}", victim.short());
            self.handler.on_evict(&victim, &victim_location);
        }
    }

    /// Exempt a fingerprint's artifact from deletion.
    ///
    /// Protection is counted, and may be taken before the key is indexed.
    pub fn protect(&self, fingerprint: &Fingerprint) {
        *self.lock().protected.entry(*fingerprint).or_insert(0) += 1;
    }

    /// Release one protection; a no-op for unprotected keys
    pub fn unprotect(&self, fingerprint: &Fingerprint) {
        let mut inner = self.lock();
        if let Some(count) = inner.protected.get_mut(fingerprint) {
            *count -= 1;
            if *count == 0 {
                inner.protected.remove(fingerprint);
            }
        }
    }

    pub fn is_protected(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().protected.contains_key(fingerprint)
    }

    /// Protect a fingerprint until the returned guard is dropped
    pub fn protect_guard(self: &Arc<Self>, fingerprint: Fingerprint) -> ProtectionGuard {
        self.protect(&fingerprint);
        ProtectionGuard {
            cache: Arc::clone(self),
            fingerprint,
        }
    }

    /// Whether the key is indexed, without touching recency
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().index.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.index.len(),
            capacity: self.capacity.get(),
            protected: inner.protected.len(),
            evictions: inner.evictions,
            spared: inner.spared,
        }
    }
}

/// Scoped protection of one fingerprint
#[must_use = "protection ends when the guard is dropped"]
pub struct ProtectionGuard {
    cache: Arc<ProtectedLruCache>,
    fingerprint: Fingerprint,
}

impl ProtectionGuard {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

impl Drop for ProtectionGuard {
    fn drop(&mut self) {
        self.cache.unprotect(&self.fingerprint);
    }
}

impl std::fmt::Debug for ProtectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProtectionGuard")
            .field(&self.fingerprint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::sample_fingerprint;

    #[derive(Default)]
    struct Recorder {
        evicted: Mutex<Vec<(Fingerprint, PathBuf)>>,
    }

    impl EvictionHandler for Recorder {
        fn on_evict(&self, fingerprint: &Fingerprint, location: &Path) {
            self.evicted
                .lock()
                .unwrap()
                .push((*fingerprint, location.to_path_buf()));
        }
    }

    impl Recorder {
        fn evicted(&self) -> Vec<Fingerprint> {
            self.evicted.lock().unwrap().iter().map(|(f, _)| *f).collect()
        }
    }

    fn fp(n: usize) -> Fingerprint {
        sample_fingerprint(n as f64, 5.0)
    }

    fn loc(n: usize) -> PathBuf {
        PathBuf::from(format!("/tmp/artifact-{}.mp4", n))
    }

    fn cache(capacity: usize) -> (Arc<ProtectedLruCache>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let cache = Arc::new(ProtectedLruCache::new(capacity, recorder.clone()));
        (cache, recorder)
    }

    #[test]
    fn get_after_put() {
        let (cache, _) = cache(2);
        assert_eq!(cache.get(&fp(1)), None);
        cache.put(fp(1), loc(1));
        assert_eq!(cache.get(&fp(1)), Some(loc(1)));
    }

    #[test]
    fn overflow_evicts_exactly_lru() {
        let (cache, recorder) = cache(3);
        for n in 0..3 {
            cache.put(fp(n), loc(n));
        }
        assert!(recorder.evicted().is_empty());

        cache.put(fp(3), loc(3));

        assert_eq!(recorder.evicted(), vec![fp(0)]);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&fp(0)));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn get_refreshes_recency() {
        let (cache, recorder) = cache(3);
        for n in 0..3 {
            cache.put(fp(n), loc(n));
        }

        assert!(cache.get(&fp(0)).is_some());
        cache.put(fp(3), loc(3));

        assert_eq!(recorder.evicted(), vec![fp(1)]);
        assert!(cache.contains(&fp(0)));
    }

    #[test]
    fn put_existing_updates_and_refreshes() {
        let (cache, recorder) = cache(2);
        cache.put(fp(0), loc(0));
        cache.put(fp(1), loc(1));

        cache.put(fp(0), loc(10));
        assert_eq!(cache.len(), 2);
        cache.put(fp(2), loc(2));

        assert_eq!(recorder.evicted(), vec![fp(1)]);
        assert_eq!(cache.get(&fp(0)), Some(loc(10)));
    }

    #[test]
    fn protected_entry_leaves_index_but_is_not_deleted() {
        let (cache, recorder) = cache(2);
        cache.put(fp(0), loc(0));
        cache.put(fp(1), loc(1));
        cache.protect(&fp(0));

        cache.put(fp(2), loc(2));

        assert!(!cache.contains(&fp(0)));
        assert!(recorder.evicted().is_empty());
        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.spared, 1);
    }

    #[test]
    fn protection_is_counted() {
        let (cache, recorder) = cache(1);
        cache.put(fp(0), loc(0));
        cache.protect(&fp(0));
        cache.protect(&fp(0));
        cache.unprotect(&fp(0));
        assert!(cache.is_protected(&fp(0)));

        cache.put(fp(1), loc(1));
        assert!(recorder.evicted().is_empty());

        cache.unprotect(&fp(0));
        assert!(!cache.is_protected(&fp(0)));
    }

    #[test]
    fn unprotect_unknown_is_noop() {
        let (cache, _) = cache(1);
        cache.unprotect(&fp(7));
        assert!(!cache.is_protected(&fp(7)));
        assert_eq!(cache.stats().protected, 0);
    }

    #[test]
    fn guard_releases_on_drop() {
        let (cache, recorder) = cache(1);
        cache.put(fp(0), loc(0));
        {
            let guard = cache.protect_guard(fp(0));
            assert_eq!(guard.fingerprint(), &fp(0));
            assert!(cache.is_protected(&fp(0)));
        }
        assert!(!cache.is_protected(&fp(0)));

        cache.put(fp(1), loc(1));
        assert_eq!(recorder.evicted(), vec![fp(0)]);
    }

    #[test]
    fn index_stays_bounded_under_churn() {
        let (cache, recorder) = cache(2);
        for n in 0..10 {
            cache.put(fp(n), loc(n));
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(recorder.evicted().len(), 8);
        assert_eq!(cache.get(&fp(9)), Some(loc(9)));
        assert_eq!(cache.get(&fp(8)), Some(loc(8)));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (cache, _) = cache(0);
        assert_eq!(cache.capacity(), 1);
        cache.put(fp(0), loc(0));
        assert_eq!(cache.get(&fp(0)), Some(loc(0)));
    }
}
