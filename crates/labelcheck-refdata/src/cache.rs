//! # Reference Cache
//!
//! Serves a [`DatasetSnapshot`] per dataset with bounded staleness while
//! keeping reads against the external store to a minimum.
//!
//! ## Freshness
//!
//! A published snapshot is fresh while its age is below the TTL and no
//! [`invalidate()`](ReferenceCache::invalidate) happened since the load that
//! produced it began. Invalidation bumps a per-dataset generation counter;
//! a snapshot remembers the generation it was loaded under, so an
//! invalidation that lands during an in-flight load still forces another
//! refresh on the next read.
//!
//! ## Single Flight
//!
//! Each dataset has its own refresh mutex. A reader that finds the snapshot
//! stale takes the mutex, re-checks freshness (another reader may have just
//! refreshed it), and only then reads the store. Concurrent readers of a
//! cold dataset therefore block on one bulk load instead of issuing their
//! own. The published snapshot sits behind a `parking_lot::RwLock` that is
//! held only long enough to clone an `Arc`, never across a store read.
//!
//! ## Failure
//!
//! A failed refresh serves the previous snapshot and logs a warning. Only a
//! dataset that has never loaded surfaces [`CacheError::DataUnavailable`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use labelcheck_core::{DatasetKind, ReferenceEntry};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::admin::InvalidationSink;
use crate::config::CacheConfig;
use crate::error::{CacheError, RefreshError};
use crate::snapshot::DatasetSnapshot;
use crate::store::{PageRequest, ReferenceStore};

#[derive(Debug, Clone)]
struct Published {
    snapshot: Arc<DatasetSnapshot>,
    loaded_at: Instant,
    generation: u64,
}

#[derive(Debug, Default)]
struct RefreshState {
    /// Time and generation of the most recent failed refresh.
    last_failure: Option<(Instant, u64)>,
}

#[derive(Debug, Default)]
struct DatasetSlot {
    published: RwLock<Option<Published>>,
    refresh: Mutex<RefreshState>,
    generation: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
    stale_serves: AtomicU64,
}

/// Per-dataset counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Successful bulk loads.
    pub loads: u64,
    /// Failed bulk loads.
    pub failures: u64,
    /// Reads answered with a stale snapshot after a failure.
    pub stale_serves: u64,
}

/// In-memory cache of reference snapshots, one slot per dataset.
pub struct ReferenceCache {
    store: Arc<dyn ReferenceStore>,
    config: CacheConfig,
    slots: [DatasetSlot; 4],
    next_version: AtomicU64,
}

impl std::fmt::Debug for ReferenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceCache")
            .field("config", &self.config)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl ReferenceCache {
    /// Create an empty cache over `store`. Nothing is loaded until the first
    /// [`get()`](Self::get).
    pub fn new(store: Arc<dyn ReferenceStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            slots: Default::default(),
            next_version: AtomicU64::new(1),
        }
    }

    /// Cache configuration in effect.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return a snapshot of `kind`, refreshing it first if it is missing,
    /// expired, or invalidated.
    ///
    /// # Errors
    ///
    /// [`CacheError::DataUnavailable`] when the refresh fails and no earlier
    /// snapshot exists.
    pub fn get(&self, kind: DatasetKind) -> Result<Arc<DatasetSnapshot>, CacheError> {
        let slot = self.slot(kind);

        if let Some(snapshot) = self.fresh(slot) {
            tracing::trace!(dataset = %kind, "reference cache hit");
            return Ok(snapshot);
        }

        let mut state = slot.refresh.lock();

        // Another caller may have refreshed while we waited for the lock.
        if let Some(snapshot) = self.fresh(slot) {
            tracing::debug!(dataset = %kind, "snapshot refreshed by a concurrent caller");
            return Ok(snapshot);
        }

        let generation = slot.generation.load(Ordering::Acquire);
        let stale = slot.published.read().clone();

        if let (Some(previous), Some((failed_at, failed_generation))) = (&stale, state.last_failure) {
            if failed_generation == generation && failed_at.elapsed() < self.config.retry_backoff {
                slot.stale_serves.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(dataset = %kind, "refresh backing off; serving stale snapshot");
                return Ok(Arc::clone(&previous.snapshot));
            }
        }

        match self.load(kind) {
            Ok((rows, pages)) => {
                let version = self.next_version.fetch_add(1, Ordering::Relaxed);
                let snapshot = Arc::new(DatasetSnapshot::build(kind, rows, version, pages));
                *slot.published.write() = Some(Published {
                    snapshot: Arc::clone(&snapshot),
                    loaded_at: Instant::now(),
                    generation,
                });
                state.last_failure = None;
                slot.loads.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    dataset = %kind,
                    version,
                    entries = snapshot.len(),
                    rejected = snapshot.rejected_rows(),
                    pages,
                    digest = %snapshot.digest().short_hex(),
                    "published reference snapshot"
                );
                Ok(snapshot)
            }
            Err(error) => {
                state.last_failure = Some((Instant::now(), generation));
                slot.failures.fetch_add(1, Ordering::Relaxed);
                match stale {
                    Some(previous) => {
                        slot.stale_serves.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            dataset = %kind,
                            error = %error,
                            version = previous.snapshot.version(),
                            age_secs = previous.loaded_at.elapsed().as_secs(),
                            "reference refresh failed; serving stale snapshot"
                        );
                        Ok(previous.snapshot)
                    }
                    None => {
                        tracing::error!(
                            dataset = %kind,
                            error = %error,
                            "reference refresh failed with no snapshot to fall back on"
                        );
                        Err(CacheError::DataUnavailable {
                            dataset: kind,
                            source: error,
                        })
                    }
                }
            }
        }
    }

    /// Force the next [`get()`](Self::get) of `kind` to refresh regardless
    /// of TTL. The current snapshot keeps serving readers that already
    /// hold it.
    pub fn invalidate(&self, kind: DatasetKind) {
        let slot = self.slot(kind);
        let generation = slot.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(dataset = %kind, generation, "reference dataset invalidated");
    }

    /// Invalidate every dataset.
    pub fn invalidate_all(&self) {
        for kind in DatasetKind::all() {
            self.invalidate(*kind);
        }
    }

    /// The currently published snapshot, without refreshing.
    pub fn peek(&self, kind: DatasetKind) -> Option<Arc<DatasetSnapshot>> {
        self.slot(kind)
            .published
            .read()
            .as_ref()
            .map(|p| Arc::clone(&p.snapshot))
    }

    /// Counters for `kind`.
    pub fn stats(&self, kind: DatasetKind) -> CacheStats {
        let slot = self.slot(kind);
        CacheStats {
            loads: slot.loads.load(Ordering::Relaxed),
            failures: slot.failures.load(Ordering::Relaxed),
            stale_serves: slot.stale_serves.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, kind: DatasetKind) -> &DatasetSlot {
        let idx = match kind {
            DatasetKind::Gras => 0,
            DatasetKind::Ndi => 1,
            DatasetKind::Odi => 2,
            DatasetKind::AllergenDerivative => 3,
        };
        &self.slots[idx]
    }

    fn fresh(&self, slot: &DatasetSlot) -> Option<Arc<DatasetSnapshot>> {
        let published = slot.published.read();
        let current = published.as_ref()?;
        let generation = slot.generation.load(Ordering::Acquire);
        if current.generation == generation && current.loaded_at.elapsed() < self.config.ttl {
            Some(Arc::clone(&current.snapshot))
        } else {
            None
        }
    }

    /// Read every active row of `kind`, one page at a time, until the store
    /// returns a short page or no continuation token.
    fn load(&self, kind: DatasetKind) -> Result<(Vec<ReferenceEntry>, usize), RefreshError> {
        let page_size = self.config.page_size;
        let mut request = PageRequest::first(page_size);
        let mut rows = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut pages = 0usize;

        loop {
            if pages >= self.config.max_pages {
                return Err(RefreshError::PageLimitExceeded {
                    max_pages: self.config.max_pages,
                });
            }
            let page = self.store.list_active(kind, &request)?;
            pages += 1;
            let short_page = page.entries.len() < page_size;
            tracing::trace!(dataset = %kind, page = pages, rows = page.entries.len(), "read reference page");
            rows.extend(page.entries);

            match page.next_page_token {
                Some(token) if !short_page => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(RefreshError::RepeatedPageToken { token });
                    }
                    request.page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok((rows, pages))
    }
}

impl InvalidationSink for ReferenceCache {
    fn invalidate(&self, kind: DatasetKind) {
        ReferenceCache::invalidate(self, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::InMemoryReferenceStore;
    use crate::store::ReferencePage;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    fn gras(name: &str) -> ReferenceEntry {
        ReferenceEntry::new(DatasetKind::Gras, name, Vec::<String>::new(), "21 CFR 182")
    }

    /// Wraps a store, counting page reads and optionally failing them.
    struct FlakyStore {
        inner: InMemoryReferenceStore,
        calls: AtomicU64,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn new(entries: Vec<ReferenceEntry>) -> Self {
            Self {
                inner: InMemoryReferenceStore::with_entries(entries),
                calls: AtomicU64::new(0),
                failing: AtomicBool::new(false),
            }
        }
    }

    impl ReferenceStore for FlakyStore {
        fn list_active(
            &self,
            kind: DatasetKind,
            request: &PageRequest,
        ) -> Result<ReferencePage, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("store offline".into()));
            }
            self.inner.list_active(kind, request)
        }
    }

    fn config(ttl: Duration, page_size: usize) -> CacheConfig {
        CacheConfig {
            ttl,
            page_size,
            retry_backoff: Duration::ZERO,
            ..CacheConfig::default()
        }
    }

    #[test]
    fn second_get_is_served_from_cache() {
        let store = Arc::new(FlakyStore::new(vec![gras("Caffeine")]));
        let cache = ReferenceCache::new(store.clone(), CacheConfig::default());

        let first = cache.get(DatasetKind::Gras).unwrap();
        let second = cache.get(DatasetKind::Gras).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(DatasetKind::Gras).loads, 1);
    }

    #[test]
    fn loads_all_pages_until_short_page() {
        let rows: Vec<_> = (0..2_205).map(|i| gras(&format!("Substance {i:04}"))).collect();
        let store = Arc::new(FlakyStore::new(rows));
        let cache = ReferenceCache::new(store.clone(), CacheConfig::default());

        let snap = cache.get(DatasetKind::Gras).unwrap();
        assert_eq!(snap.len(), 2_205);
        assert_eq!(snap.page_count(), 3);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exact_page_multiple_stops_on_missing_token() {
        let rows: Vec<_> = (0..4).map(|i| gras(&format!("Substance {i}"))).collect();
        let store = Arc::new(FlakyStore::new(rows));
        let cache = ReferenceCache::new(store.clone(), config(Duration::from_secs(60), 2));

        let snap = cache.get(DatasetKind::Gras).unwrap();
        assert_eq!(snap.len(), 4);
        assert_eq!(snap.page_count(), 2);
    }

    #[test]
    fn expired_snapshot_is_refreshed() {
        let store = Arc::new(FlakyStore::new(vec![gras("Caffeine")]));
        let cache = ReferenceCache::new(store.clone(), config(Duration::ZERO, 1_000));

        let first = cache.get(DatasetKind::Gras).unwrap();
        let second = cache.get(DatasetKind::Gras).unwrap();
        assert!(second.version() > first.version());
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidate_forces_refresh_within_ttl() {
        let store = Arc::new(FlakyStore::new(vec![gras("Caffeine")]));
        let cache = ReferenceCache::new(store.clone(), CacheConfig::default());

        let first = cache.get(DatasetKind::Gras).unwrap();
        store.inner.upsert(gras("Pectin"));
        assert_eq!(cache.get(DatasetKind::Gras).unwrap().len(), 1);

        cache.invalidate(DatasetKind::Gras);
        let refreshed = cache.get(DatasetKind::Gras).unwrap();
        assert_eq!(refreshed.len(), 2);
        assert!(refreshed.version() > first.version());
    }

    #[test]
    fn datasets_have_independent_clocks() {
        let store = Arc::new(FlakyStore::new(vec![gras("Caffeine")]));
        let cache = ReferenceCache::new(store.clone(), CacheConfig::default());

        cache.get(DatasetKind::Gras).unwrap();
        cache.get(DatasetKind::Ndi).unwrap();
        cache.invalidate(DatasetKind::Ndi);
        cache.get(DatasetKind::Gras).unwrap();
        assert_eq!(cache.stats(DatasetKind::Gras).loads, 1);
        cache.get(DatasetKind::Ndi).unwrap();
        assert_eq!(cache.stats(DatasetKind::Ndi).loads, 2);
    }

    #[test]
    fn failed_refresh_serves_stale_snapshot() {
        let store = Arc::new(FlakyStore::new(vec![gras("Caffeine")]));
        let cache = ReferenceCache::new(store.clone(), config(Duration::ZERO, 1_000));

        let good = cache.get(DatasetKind::Gras).unwrap();
        store.failing.store(true, Ordering::SeqCst);
        let stale = cache.get(DatasetKind::Gras).unwrap();

        assert!(Arc::ptr_eq(&good, &stale));
        let stats = cache.stats(DatasetKind::Gras);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.stale_serves, 1);
    }

    #[test]
    fn first_load_failure_is_data_unavailable() {
        let store = Arc::new(FlakyStore::new(vec![gras("Caffeine")]));
        store.failing.store(true, Ordering::SeqCst);
        let cache = ReferenceCache::new(store.clone(), CacheConfig::default());

        let err = cache.get(DatasetKind::Gras).unwrap_err();
        assert!(matches!(
            err,
            CacheError::DataUnavailable {
                dataset: DatasetKind::Gras,
                ..
            }
        ));

        // Recovers once the store does.
        store.failing.store(false, Ordering::SeqCst);
        assert_eq!(cache.get(DatasetKind::Gras).unwrap().len(), 1);
    }

    #[test]
    fn backoff_suppresses_retries_until_invalidated() {
        let store = Arc::new(FlakyStore::new(vec![gras("Caffeine")]));
        let cache = ReferenceCache::new(
            store.clone(),
            CacheConfig {
                ttl: Duration::ZERO,
                retry_backoff: Duration::from_secs(3_600),
                ..CacheConfig::default()
            },
        );

        cache.get(DatasetKind::Gras).unwrap();
        store.failing.store(true, Ordering::SeqCst);
        cache.get(DatasetKind::Gras).unwrap();
        let calls_after_failure = store.calls.load(Ordering::SeqCst);

        cache.get(DatasetKind::Gras).unwrap();
        cache.get(DatasetKind::Gras).unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), calls_after_failure);

        cache.invalidate(DatasetKind::Gras);
        cache.get(DatasetKind::Gras).unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), calls_after_failure + 1);
    }

    /// A store that always claims there is another page.
    struct EndlessStore;

    impl ReferenceStore for EndlessStore {
        fn list_active(
            &self,
            kind: DatasetKind,
            request: &PageRequest,
        ) -> Result<ReferencePage, StoreError> {
            let offset: usize = request
                .page_token
                .as_deref()
                .map(|t| t.parse().unwrap_or(0))
                .unwrap_or(0);
            Ok(ReferencePage {
                entries: (0..request.page_size)
                    .map(|i| ReferenceEntry::new(kind, format!("row {}", offset + i), Vec::<String>::new(), ""))
                    .collect(),
                next_page_token: Some((offset + request.page_size).to_string()),
            })
        }
    }

    #[test]
    fn runaway_pagination_is_bounded() {
        let cache = ReferenceCache::new(
            Arc::new(EndlessStore),
            CacheConfig {
                page_size: 2,
                max_pages: 5,
                ..CacheConfig::default()
            },
        );
        let err = cache.get(DatasetKind::Gras).unwrap_err();
        assert!(matches!(
            err,
            CacheError::DataUnavailable {
                source: RefreshError::PageLimitExceeded { max_pages: 5 },
                ..
            }
        ));
    }

    /// A store that hands out the same continuation token forever.
    struct LoopingStore;

    impl ReferenceStore for LoopingStore {
        fn list_active(
            &self,
            kind: DatasetKind,
            request: &PageRequest,
        ) -> Result<ReferencePage, StoreError> {
            Ok(ReferencePage {
                entries: (0..request.page_size)
                    .map(|i| ReferenceEntry::new(kind, format!("row {i}"), Vec::<String>::new(), ""))
                    .collect(),
                next_page_token: Some("again".into()),
            })
        }
    }

    #[test]
    fn repeated_page_token_is_rejected() {
        let cache = ReferenceCache::new(
            Arc::new(LoopingStore),
            CacheConfig {
                page_size: 1,
                ..CacheConfig::default()
            },
        );
        let err = cache.get(DatasetKind::Odi).unwrap_err();
        assert!(matches!(
            err,
            CacheError::DataUnavailable {
                source: RefreshError::RepeatedPageToken { .. },
                ..
            }
        ));
    }

    #[test]
    fn peek_does_not_load() {
        let store = Arc::new(FlakyStore::new(vec![gras("Caffeine")]));
        let cache = ReferenceCache::new(store.clone(), CacheConfig::default());
        assert!(cache.peek(DatasetKind::Gras).is_none());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        cache.get(DatasetKind::Gras).unwrap();
        assert!(cache.peek(DatasetKind::Gras).is_some());
    }
}
