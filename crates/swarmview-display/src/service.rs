//! Media resolver lifecycle
//!
//! [`MediaResolver`] owns one fetch coordinator, its binder and the mutation
//! watcher for a display tree. Instances share nothing with each other.
//!
//! ## Lifecycle
//!
//! 1. `new()` wires the components; nothing runs yet
//! 2. `start()` subscribes to the tree, dispatches binds for content already
//!    present, then spawns the watcher
//! 3. `resolve_all_media()` may be called at any time to force a full scan
//!    and wait for it
//! 4. `stop()` signals the watcher and waits for it to exit

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use parking_lot::Mutex;
use swarmview_cache::{FetchCoordinator, LocatorResolver};
use swarmview_core::{LedgerClient, SwarmClient};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::binder::{BindOutcome, DisplayBinder};
use crate::config::ResolverConfig;
use crate::error::{DisplayError, DisplayResult};
use crate::tree::DisplayTree;
use crate::watcher::{MutationWatcher, dispatch_binds};

/// Tally of one full scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub bound: usize,
    pub already_loaded: usize,
    pub not_found: usize,
    pub failed: usize,
    pub detached: usize,
    /// Elements without a media id
    pub skipped: usize,
}

impl ScanReport {
    fn record(&mut self, outcome: &BindOutcome) {
        match outcome {
            BindOutcome::Bound { .. } => self.bound += 1,
            BindOutcome::AlreadyLoaded => self.already_loaded += 1,
            BindOutcome::NotFound => self.not_found += 1,
            BindOutcome::Failed(_) | BindOutcome::ApplyFailed(_) => self.failed += 1,
            BindOutcome::Detached => self.detached += 1,
            BindOutcome::NoMediaId => self.skipped += 1,
        }
    }

    /// Elements visited by the scan
    pub fn total(&self) -> usize {
        self.bound
            + self.already_loaded
            + self.not_found
            + self.failed
            + self.detached
            + self.skipped
    }
}

/// Resolves media for every element of a display tree
pub struct MediaResolver {
    config: ResolverConfig,
    binder: DisplayBinder,
    shutdown_tx: broadcast::Sender<()>,
    background_tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl MediaResolver {
    /// Wire a resolver over an existing tree
    pub fn new(
        config: ResolverConfig,
        ledger: Arc<dyn LedgerClient>,
        swarm: Arc<dyn SwarmClient>,
        tree: Arc<DisplayTree>,
    ) -> Self {
        let coordinator = FetchCoordinator::new(config.cache.clone(), swarm);
        let binder = DisplayBinder::new(tree, LocatorResolver::new(ledger), coordinator);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            binder,
            shutdown_tx,
            background_tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Wire a resolver over a new, empty tree
    pub fn with_new_tree(
        config: ResolverConfig,
        ledger: Arc<dyn LedgerClient>,
        swarm: Arc<dyn SwarmClient>,
    ) -> Self {
        let tree = Arc::new(DisplayTree::with_capacity(config.event_channel_capacity));
        Self::new(config, ledger, swarm, tree)
    }

    /// Start watching the tree
    ///
    /// Binds for elements already in the tree are dispatched before the
    /// watcher begins; use [`resolve_all_media`](Self::resolve_all_media) to
    /// wait for content explicitly.
    #[instrument(skip(self))]
    pub async fn start(&self) -> DisplayResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(DisplayError::AlreadyStarted);
        }

        let mutations = self.tree().subscribe();
        let initial = dispatch_binds(&self.binder, self.tree().root());

        let watcher = MutationWatcher::spawn(
            self.binder.clone(),
            mutations,
            self.shutdown_tx.subscribe(),
        );
        self.background_tasks.lock().push(watcher);

        info!(initial, "Media resolver started");
        Ok(())
    }

    /// Stop watching the tree
    ///
    /// Binds already in flight run to completion.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> DisplayResult<()> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Ok(()); // Already stopped
        }

        let _ = self.shutdown_tx.send(());

        let tasks: Vec<_> = self.background_tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }

        info!("Media resolver stopped");
        Ok(())
    }

    /// Bind every element that still needs media and wait for the results
    ///
    /// Works whether or not the resolver is started. Elements are bound
    /// concurrently, so one slow or failing item never blocks the others.
    #[instrument(skip(self))]
    pub async fn resolve_all_media(&self) -> ScanReport {
        let pending = self.tree().bound_elements(self.tree().root());
        let outcomes = join_all(pending.iter().map(|b| self.binder.bind(b.element))).await;

        let mut report = ScanReport::default();
        for outcome in &outcomes {
            report.record(outcome);
        }
        info!(
            bound = report.bound,
            not_found = report.not_found,
            failed = report.failed,
            "Scan complete"
        );
        report
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn tree(&self) -> &Arc<DisplayTree> {
        self.binder.tree()
    }

    pub fn binder(&self) -> &DisplayBinder {
        &self.binder
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        self.binder.coordinator()
    }
}

impl Drop for MediaResolver {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmview_core::{MockLedger, MockSwarm};

    fn resolver() -> MediaResolver {
        MediaResolver::with_new_tree(
            ResolverConfig::default(),
            Arc::new(MockLedger::new()),
            Arc::new(MockSwarm::new()),
        )
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let resolver = resolver();
        assert!(!resolver.is_started());

        resolver.start().await.unwrap();
        assert!(resolver.is_started());
        assert_eq!(resolver.start().await, Err(DisplayError::AlreadyStarted));

        resolver.stop().await.unwrap();
        assert!(!resolver.is_started());
        resolver.stop().await.unwrap();
    }

    #[test]
    fn test_report_tallies() {
        let mut report = ScanReport::default();
        report.record(&BindOutcome::NoMediaId);
        report.record(&BindOutcome::Detached);
        report.record(&BindOutcome::ApplyFailed(DisplayError::RootElement));
        report.record(&BindOutcome::NotFound);

        assert_eq!(report.skipped, 1);
        assert_eq!(report.detached, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.total(), 4);
    }

    #[tokio::test]
    async fn test_empty_scan() {
        let report = resolver().resolve_all_media().await;
        assert_eq!(report, ScanReport::default());
        assert_eq!(report.total(), 0);
    }
}
