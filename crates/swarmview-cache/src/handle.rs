//! Locally dereferenceable resource handles
//!
//! A materialized payload is published under an object-URL style handle
//! (`blob:swarmview/<uuid>`). The display layer stores only the handle
//! string; the bytes stay in the registry until the handle is revoked.

use std::fmt;

use bytes::Bytes;
use dashmap::DashMap;
use tracing::trace;
use uuid::Uuid;

use crate::config::DEFAULT_HANDLE_PREFIX;

/// Handle to a registered byte buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    url: String,
}

impl ResourceHandle {
    /// The handle as a string, suitable for an element's `src`
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Registry of live handles
#[derive(Debug)]
pub struct HandleRegistry {
    prefix: String,
    buffers: DashMap<String, Bytes>,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_PREFIX)
    }
}

impl HandleRegistry {
    /// Create a registry issuing handles under `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            buffers: DashMap::new(),
        }
    }

    /// Register a buffer and return a fresh handle for it
    pub fn create(&self, bytes: Bytes) -> ResourceHandle {
        let url = format!("{}/{}", self.prefix, Uuid::new_v4());
        trace!(handle = %url, size = bytes.len(), "Registered handle");
        self.buffers.insert(url.clone(), bytes);
        ResourceHandle { url }
    }

    /// Dereference a handle; `None` once revoked
    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Bytes> {
        self.resolve_url(handle.url())
    }

    /// Dereference a handle given as a plain string (e.g. an element's `src`)
    pub fn resolve_url(&self, url: &str) -> Option<Bytes> {
        self.buffers.get(url).map(|b| b.clone())
    }

    /// Release the buffer behind a handle
    ///
    /// Returns whether the handle was live.
    pub fn revoke(&self, handle: &ResourceHandle) -> bool {
        let revoked = self.buffers.remove(handle.url()).is_some();
        if revoked {
            trace!(handle = %handle, "Revoked handle");
        }
        revoked
    }

    /// Whether a handle string was issued here (live or not)
    pub fn owns(&self, url: &str) -> bool {
        url.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Check if no handles are live
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_resolve_revoke() {
        let registry = HandleRegistry::default();
        let handle = registry.create(Bytes::from_static(b"pixels"));

        assert!(handle.url().starts_with("blob:swarmview/"));
        assert!(registry.owns(handle.url()));
        assert_eq!(registry.resolve(&handle).unwrap(), Bytes::from_static(b"pixels"));
        assert_eq!(registry.len(), 1);

        assert!(registry.revoke(&handle));
        assert!(registry.resolve(&handle).is_none());
        assert!(!registry.revoke(&handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handles_are_unique() {
        let registry = HandleRegistry::new("blob:test");
        let a = registry.create(Bytes::from_static(b"same"));
        let b = registry.create(Bytes::from_static(b"same"));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(!registry.owns("https://example.com/a.png"));
    }
}
