//! In-memory resolution cache
//!
//! Maps content locators to materialized resources. Locators are content
//! addressed, so an entry never goes stale; there is no eviction policy and
//! entries live until explicitly removed.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use swarmview_core::ContentLocator;
use tracing::{debug, trace};

use crate::resource::MaterializedResource;

/// Locator to resource mapping
///
/// Holds at most one resource per locator: [`put`](Self::put) keeps an
/// existing entry rather than replacing it.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: DashMap<ContentLocator, Arc<MaterializedResource>>,
}

impl ResolutionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a locator
    pub fn get(&self, locator: &ContentLocator) -> Option<Arc<MaterializedResource>> {
        let hit = self.entries.get(locator).map(|r| Arc::clone(&r));
        trace!(hash = %locator.short_hash(), hit = hit.is_some(), "Cache lookup");
        hit
    }

    /// Store a resource, returning the entry that ends up cached
    ///
    /// If the locator is already cached the existing resource wins and is
    /// returned; the new one is not stored.
    pub fn put(
        &self,
        locator: ContentLocator,
        resource: Arc<MaterializedResource>,
    ) -> Arc<MaterializedResource> {
        match self.entries.entry(locator) {
            Entry::Occupied(existing) => {
                debug!(hash = %existing.key().short_hash(), "Locator already cached, keeping existing entry");
                Arc::clone(existing.get())
            }
            Entry::Vacant(slot) => {
                debug!(hash = %slot.key().short_hash(), handle = %resource.handle, "Cached resource");
                Arc::clone(slot.insert(resource).value())
            }
        }
    }

    /// Check if a locator is cached
    pub fn contains(&self, locator: &ContentLocator) -> bool {
        self.entries.contains_key(locator)
    }

    /// Remove a locator's entry
    pub fn remove(&self, locator: &ContentLocator) -> Option<Arc<MaterializedResource>> {
        self.entries.remove(locator).map(|(_, resource)| resource)
    }

    /// Number of cached locators
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All cached locators
    pub fn locators(&self) -> Vec<ContentLocator> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}
