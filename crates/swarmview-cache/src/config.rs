//! Configuration for the fetch coordinator

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default upper bound on a single swarm fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between file-list checks on a ready download
pub const DEFAULT_FILE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default prefix for locally dereferenceable handles
pub const DEFAULT_HANDLE_PREFIX: &str = "blob:swarmview";

/// Configuration for the fetch coordinator and its cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Upper bound on one swarm fetch, from `add` to a materialized payload.
    /// `None` waits forever.
    pub fetch_timeout: Option<Duration>,
    /// How often to re-check an empty file list after the swarm reports ready
    pub file_poll_interval: Duration,
    /// Prefix for resource handles
    pub handle_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT),
            file_poll_interval: DEFAULT_FILE_POLL_INTERVAL,
            handle_prefix: DEFAULT_HANDLE_PREFIX.to_string(),
        }
    }
}

impl CacheConfig {
    /// Set the fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Disable the fetch timeout (fetches may wait forever)
    pub fn without_fetch_timeout(mut self) -> Self {
        self.fetch_timeout = None;
        self
    }

    /// Set the file-list poll interval
    pub fn with_file_poll_interval(mut self, interval: Duration) -> Self {
        self.file_poll_interval = interval;
        self
    }

    /// Set the handle prefix
    pub fn with_handle_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.handle_prefix = prefix.into();
        self
    }
}
