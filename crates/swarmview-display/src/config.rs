//! Media resolver configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use swarmview_cache::CacheConfig;

use crate::tree::DEFAULT_EVENT_CAPACITY;

/// Configuration for a [`MediaResolver`](crate::MediaResolver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Fetch coordinator and cache settings
    pub cache: CacheConfig,
    /// Mutation stream capacity for trees the resolver creates itself
    pub event_channel_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            event_channel_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ResolverConfig {
    /// Replace the cache settings
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Set the swarm fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.cache = self.cache.with_fetch_timeout(timeout);
        self
    }

    /// Set the mutation stream capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}
