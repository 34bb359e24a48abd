//! Background mutation watcher
//!
//! Consumes the tree's mutation stream in FIFO order. Each inserted subtree
//! is scanned synchronously and every element that still needs media is
//! bound on its own task, so a slow fetch never holds up the next event.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::binder::DisplayBinder;
use crate::element::ElementId;
use crate::tree::Mutation;

/// Dispatches binds for elements entering the tree
pub struct MutationWatcher {
    binder: DisplayBinder,
}

impl MutationWatcher {
    /// Spawn the watcher loop
    ///
    /// `mutations` should be subscribed before any initial scan so that no
    /// insertion falls between the scan and the first received event.
    pub fn spawn(
        binder: DisplayBinder,
        mutations: broadcast::Receiver<Mutation>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let watcher = Self { binder };
        tokio::spawn(watcher.run(mutations, shutdown_rx))
    }

    async fn run(
        self,
        mut mutations: broadcast::Receiver<Mutation>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        debug!("Mutation watcher started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Mutation watcher shutting down");
                    break;
                }
                event = mutations.recv() => match event {
                    Ok(Mutation::Inserted { root }) => {
                        self.dispatch(root);
                    }
                    Ok(Mutation::Removed { id }) => {
                        trace!(element = %id, "Element removed");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Mutation stream lagged, rescanning tree");
                        self.dispatch(self.binder.tree().root());
                    }
                    Err(RecvError::Closed) => {
                        info!("Mutation stream closed");
                        break;
                    }
                },
            }
        }
    }

    /// Spawn a bind for every eligible element under `root`
    fn dispatch(&self, root: ElementId) -> usize {
        dispatch_binds(&self.binder, root)
    }
}

/// Spawn a bind for every eligible element under `root`, returning how many
pub(crate) fn dispatch_binds(binder: &DisplayBinder, root: ElementId) -> usize {
    let pending = binder.tree().bound_elements(root);
    for element in &pending {
        let binder = binder.clone();
        let id = element.element;
        tokio::spawn(async move {
            binder.bind(id).await;
        });
    }
    if !pending.is_empty() {
        debug!(root = %root, count = pending.len(), "Dispatched binds");
    }
    pending.len()
}
