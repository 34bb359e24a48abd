//! Swarm fetch coordination
//!
//! [`FetchCoordinator`] bundles the resolution cache, the registry of
//! in-flight fetches, the swarm client and the materializer into one
//! instance. It guarantees that concurrent requests for one locator share a
//! single swarm download and observe the same outcome.
//!
//! ## Deduplication
//!
//! The "check cache, else join or create a pending fetch" step runs under a
//! single mutex that also covers storing the outcome, so two callers can
//! never both start a download for the same locator, and a locator is never
//! fetched again once it is cached. The mutex is never held across an
//! `.await`.
//!
//! The swarm work itself runs on a spawned task. Callers only wait on a
//! `watch` channel, so a caller that gives up does not strand the others.
//! A task that panics still retires its pending entry with an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use swarmview_core::{ContentLocator, MediaError, SwarmClient, SwarmFile, SwarmTorrent};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::cache::ResolutionCache;
use crate::config::CacheConfig;
use crate::handle::HandleRegistry;
use crate::materializer::Materializer;
use crate::resource::MaterializedResource;

/// Outcome shared with every waiter of one fetch
pub type FetchOutcome = Result<Arc<MaterializedResource>, MediaError>;

/// An in-flight fetch for one locator
struct PendingFetch {
    outcome: watch::Sender<Option<FetchOutcome>>,
    waiters: usize,
    started: Instant,
}

impl PendingFetch {
    fn new() -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            outcome,
            waiters: 1,
            started: Instant::now(),
        }
    }

    fn subscribe(&mut self) -> watch::Receiver<Option<FetchOutcome>> {
        self.outcome.subscribe()
    }
}

/// Result of the synchronous lookup step
enum Lookup {
    Cached(Arc<MaterializedResource>),
    Joined(watch::Receiver<Option<FetchOutcome>>),
    Started(watch::Receiver<Option<FetchOutcome>>),
}

/// Counters describing coordinator activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Requests served straight from the cache
    pub cache_hits: u64,
    /// Requests that attached to an in-flight fetch
    pub joins: u64,
    /// Swarm fetches started
    pub fetches_started: u64,
    /// Swarm fetches that ended in an error
    pub fetches_failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    joins: AtomicU64,
    fetches_started: AtomicU64,
    fetches_failed: AtomicU64,
}

struct Inner {
    config: CacheConfig,
    cache: ResolutionCache,
    pending: Mutex<HashMap<ContentLocator, PendingFetch>>,
    swarm: Arc<dyn SwarmClient>,
    materializer: Materializer,
    counters: Counters,
}

/// Deduplicating fetch coordinator with its resolution cache
///
/// Cheap to clone; clones share the same cache and pending registry.
/// Independent instances share nothing, which keeps tests isolated.
#[derive(Clone)]
pub struct FetchCoordinator {
    inner: Arc<Inner>,
}

impl FetchCoordinator {
    /// Create a coordinator over a swarm client
    pub fn new(config: CacheConfig, swarm: Arc<dyn SwarmClient>) -> Self {
        let handles = Arc::new(HandleRegistry::new(config.handle_prefix.clone()));
        Self {
            inner: Arc::new(Inner {
                config,
                cache: ResolutionCache::new(),
                pending: Mutex::new(HashMap::new()),
                swarm,
                materializer: Materializer::new(handles),
                counters: Counters::default(),
            }),
        }
    }

    /// Fetch and materialize the content behind `locator`
    ///
    /// Served from the cache when possible; otherwise joins the in-flight
    /// fetch for the locator or starts one. Every waiter of one fetch gets
    /// the same outcome and the same resource instance. Failures are not
    /// cached, so a later call starts over.
    ///
    /// Must be called within a tokio runtime.
    #[instrument(skip(self), fields(hash = %locator.short_hash()))]
    pub async fn fetch(&self, locator: &ContentLocator) -> FetchOutcome {
        let mut rx = match self.lookup_or_start(locator) {
            Lookup::Cached(resource) => return Ok(resource),
            Lookup::Joined(rx) | Lookup::Started(rx) => rx,
        };

        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| MediaError::fetch(locator.as_str(), "fetch task ended without a result"))?;

        match &*outcome {
            Some(outcome) => outcome.clone(),
            None => Err(MediaError::fetch(locator.as_str(), "fetch finished without a result")),
        }
    }

    /// Synchronous cache lookup; never touches the swarm
    pub fn cached(&self, locator: &ContentLocator) -> Option<Arc<MaterializedResource>> {
        self.inner.cache.get(locator)
    }

    /// Whether a fetch for `locator` is in flight
    pub fn is_pending(&self, locator: &ContentLocator) -> bool {
        self.inner.pending.lock().contains_key(locator)
    }

    /// Number of fetches in flight
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// The resolution cache
    pub fn cache(&self) -> &ResolutionCache {
        &self.inner.cache
    }

    /// The registry resource handles are published into
    pub fn handles(&self) -> &Arc<HandleRegistry> {
        self.inner.materializer.handles()
    }

    /// The configuration in use
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Snapshot of the activity counters
    pub fn stats(&self) -> CoordinatorStats {
        let c = &self.inner.counters;
        CoordinatorStats {
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            joins: c.joins.load(Ordering::Relaxed),
            fetches_started: c.fetches_started.load(Ordering::Relaxed),
            fetches_failed: c.fetches_failed.load(Ordering::Relaxed),
        }
    }

    /// Drop a cached locator and revoke its handle
    ///
    /// Elements still pointing at the handle will no longer dereference.
    /// Returns whether an entry was removed.
    pub fn evict(&self, locator: &ContentLocator) -> bool {
        let _guard = self.inner.pending.lock();
        match self.inner.cache.remove(locator) {
            Some(resource) => {
                self.handles().revoke(&resource.handle);
                info!(hash = %locator.short_hash(), "Evicted cached resource");
                true
            }
            None => false,
        }
    }

    /// Cache check plus join-or-create, as one step under the pending lock
    fn lookup_or_start(&self, locator: &ContentLocator) -> Lookup {
        let mut pending = self.inner.pending.lock();

        if let Some(resource) = self.inner.cache.get(locator) {
            self.inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            trace!("Cache hit");
            return Lookup::Cached(resource);
        }

        if let Some(fetch) = pending.get_mut(locator) {
            fetch.waiters += 1;
            self.inner.counters.joins.fetch_add(1, Ordering::Relaxed);
            debug!(waiters = fetch.waiters, "Joined in-flight fetch");
            return Lookup::Joined(fetch.subscribe());
        }

        let mut fetch = PendingFetch::new();
        let rx = fetch.subscribe();
        pending.insert(locator.clone(), fetch);
        drop(pending);

        self.inner
            .counters
            .fetches_started
            .fetch_add(1, Ordering::Relaxed);
        debug!("Starting swarm fetch");

        let guard = CompletionGuard {
            inner: Arc::clone(&self.inner),
            locator: locator.clone(),
            completed: false,
        };
        tokio::spawn(async move {
            let outcome = guard.inner.run_fetch(&guard.locator).await;
            guard.finish(outcome);
        });

        Lookup::Started(rx)
    }
}

impl Inner {
    /// The swarm pipeline, bounded by the configured timeout
    async fn run_fetch(&self, locator: &ContentLocator) -> FetchOutcome {
        let started = Instant::now();
        let result = match self.config.fetch_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.fetch_from_swarm(locator)).await {
                Ok(result) => result,
                Err(_) => Err(MediaError::Timeout {
                    locator: locator.to_string(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }),
            },
            None => self.fetch_from_swarm(locator).await,
        };

        if result.is_err() {
            // Drop the download so a retry re-adds it from scratch
            self.swarm.remove(locator);
        }

        result.map(Arc::new)
    }

    async fn fetch_from_swarm(
        &self,
        locator: &ContentLocator,
    ) -> Result<MaterializedResource, MediaError> {
        // Re-adding an active locator would only query it, so reuse it directly
        let torrent = match self.swarm.get(locator) {
            Some(torrent) => torrent,
            None => self
                .swarm
                .add(locator)
                .map_err(|e| MediaError::fetch(locator.as_str(), e.to_string()))?,
        };

        torrent
            .ready()
            .await
            .map_err(|e| MediaError::fetch(locator.as_str(), e.to_string()))?;

        let file = self.first_file(torrent.as_ref()).await;
        self.materializer.materialize(locator, file.as_ref()).await
    }

    /// Wait for the download's file list to fill in, then take file 0
    async fn first_file(&self, torrent: &dyn SwarmTorrent) -> Arc<dyn SwarmFile> {
        loop {
            if let Some(file) = torrent.files().into_iter().next() {
                return file;
            }
            trace!(hash = %torrent.info_hash(), "File list still empty");
            tokio::time::sleep(self.config.file_poll_interval).await;
        }
    }

    /// Store the outcome, wake every waiter, and retire the pending entry
    fn complete(&self, locator: &ContentLocator, outcome: FetchOutcome) {
        let mut pending = self.pending.lock();

        let outcome = match outcome {
            Ok(resource) => Ok(self.cache.put(locator.clone(), resource)),
            Err(e) => {
                self.counters.fetches_failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        };

        let Some(fetch) = pending.remove(locator) else {
            warn!(hash = %locator.short_hash(), "Completed fetch had no pending entry");
            return;
        };
        drop(pending);

        match &outcome {
            Ok(resource) => info!(
                hash = %locator.short_hash(),
                waiters = fetch.waiters,
                class = %resource.mime_class,
                elapsed_ms = fetch.started.elapsed().as_millis() as u64,
                "Fetch complete"
            ),
            Err(e) => warn!(
                hash = %locator.short_hash(),
                waiters = fetch.waiters,
                error = %e,
                "Fetch failed"
            ),
        }

        // Receivers that already gave up are fine to miss
        let _ = fetch.outcome.send(Some(outcome));
    }
}

/// Retires the pending entry even if the fetch task unwinds or is cancelled
struct CompletionGuard {
    inner: Arc<Inner>,
    locator: ContentLocator,
    completed: bool,
}

impl CompletionGuard {
    fn finish(mut self, outcome: FetchOutcome) {
        self.completed = true;
        self.inner.complete(&self.locator, outcome);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        error!(hash = %self.locator.short_hash(), "Fetch task aborted before completing");
        self.inner.swarm.remove(&self.locator);
        self.inner.complete(
            &self.locator,
            Err(MediaError::fetch(self.locator.as_str(), "fetch task aborted")),
        );
    }
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("cached", &self.inner.cache.len())
            .field("pending", &self.pending_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use swarmview_core::{MockBehavior, MockFile, MockSwarm, MimeClass};

    const AAA: &str = "magnet:?xt=urn:btih:AAA";

    fn locator(s: &str) -> ContentLocator {
        ContentLocator::parse(s).unwrap()
    }

    fn seeded_swarm() -> Arc<MockSwarm> {
        let swarm = Arc::new(MockSwarm::new());
        swarm.seed(AAA, MockFile::new("7.png", b"png bytes".to_vec()));
        swarm
    }

    #[tokio::test]
    async fn test_fetch_then_cache_hit() {
        let swarm = seeded_swarm();
        let coordinator = FetchCoordinator::new(CacheConfig::default(), swarm.clone());
        let l = locator(AAA);

        let first = coordinator.fetch(&l).await.unwrap();
        assert_eq!(first.mime_class, MimeClass::Image);
        assert!(coordinator.cached(&l).is_some());
        assert!(!coordinator.is_pending(&l));

        let second = coordinator.fetch(&l).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(swarm.add_count(), 1);

        let stats = coordinator.stats();
        assert_eq!(stats.fetches_started, 1);
        assert_eq!(stats.cache_hits, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fetches_share_one_download() {
        let swarm = seeded_swarm();
        let coordinator = FetchCoordinator::new(CacheConfig::default(), swarm.clone());
        let l = locator(AAA);

        let results = futures::future::join_all((0..16).map(|_| {
            let coordinator = coordinator.clone();
            let l = l.clone();
            tokio::spawn(async move { coordinator.fetch(&l).await })
        }))
        .await;

        let resources: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();
        assert!(resources.iter().all(|r| Arc::ptr_eq(r, &resources[0])));
        assert_eq!(swarm.add_count(), 1);
        assert_eq!(coordinator.cache().len(), 1);
        assert_eq!(coordinator.handles().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let swarm = Arc::new(MockSwarm::new());
        let coordinator = FetchCoordinator::new(CacheConfig::default(), swarm.clone());
        let l = locator("magnet:?xt=urn:btih:NOPE");

        let err = coordinator.fetch(&l).await.unwrap_err();
        assert!(matches!(err, MediaError::Fetch { .. }));
        assert!(coordinator.cached(&l).is_none());
        assert_eq!(coordinator.pending_count(), 0);
        assert_eq!(swarm.remove_count(), 1);

        swarm.seed(l.as_str(), MockFile::new("late.png", b"late".to_vec()));
        coordinator.fetch(&l).await.unwrap();
        assert_eq!(swarm.add_count_for(l.as_str()), 2);
        assert_eq!(coordinator.stats().fetches_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_resolves_waiters() {
        let swarm = Arc::new(MockSwarm::new());
        swarm.seed_with(AAA, Vec::new(), MockBehavior::Hang);
        let config = CacheConfig::default().with_fetch_timeout(Duration::from_secs(5));
        let coordinator = FetchCoordinator::new(config, swarm.clone());
        let l = locator(AAA);

        let (a, b) = tokio::join!(coordinator.fetch(&l), coordinator.fetch(&l));
        let (a, b) = (a.unwrap_err(), b.unwrap_err());
        assert!(matches!(a, MediaError::Timeout { .. }));
        assert_eq!(a, b);
        assert_eq!(swarm.add_count(), 1);
        assert!(!coordinator.is_pending(&l));
        assert_eq!(swarm.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_file_listing() {
        let swarm = Arc::new(MockSwarm::new());
        swarm.seed_with(
            AAA,
            vec![MockFile::new("7.png", b"png".to_vec())],
            MockBehavior::DelayedFiles(Duration::from_millis(300)),
        );
        let coordinator = FetchCoordinator::new(CacheConfig::default(), swarm);

        let resource = coordinator.fetch(&locator(AAA)).await.unwrap();
        assert_eq!(resource.file_name, "7.png");
    }

    #[tokio::test]
    async fn test_evict_revokes_handle() {
        let coordinator = FetchCoordinator::new(CacheConfig::default(), seeded_swarm());
        let l = locator(AAA);

        let resource = coordinator.fetch(&l).await.unwrap();
        assert!(coordinator.handles().resolve(&resource.handle).is_some());

        assert!(coordinator.evict(&l));
        assert!(coordinator.cached(&l).is_none());
        assert!(coordinator.handles().resolve(&resource.handle).is_none());
        assert!(!coordinator.evict(&l));
    }
}
