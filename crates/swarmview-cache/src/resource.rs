//! Materialized resource types

use std::fmt;

use swarmview_core::{ContentLocator, MimeClass};

use crate::handle::ResourceHandle;

/// BLAKE3 digest of a materialized payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    /// BLAKE3 hash of the content
    pub hash: [u8; 32],
    /// Size of the content in bytes
    pub size: u64,
}

impl ContentDigest {
    /// Compute a digest from data
    pub fn from_data(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self {
            hash: *hash.as_bytes(),
            size: data.len() as u64,
        }
    }

    /// Get the hash as a hex string
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Get a short hash for display (first 8 chars)
    pub fn short_hash(&self) -> String {
        hex::encode(&self.hash[..4])
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.short_hash(), self.size)
    }
}

/// A fetched payload, published under a local handle and classified
///
/// Owned by the resolution cache and shared as `Arc<MaterializedResource>`;
/// every requester of one locator sees the same instance.
#[derive(Debug, Clone)]
pub struct MaterializedResource {
    /// Locally dereferenceable handle to the bytes
    pub handle: ResourceHandle,
    /// Rendering class
    pub mime_class: MimeClass,
    /// MIME type the class was derived from
    pub mime_type: String,
    /// File name inside the download
    pub file_name: String,
    /// Digest of the bytes
    pub digest: ContentDigest,
    /// Locator the payload was fetched from
    pub source: ContentLocator,
    /// When the payload was materialized (Unix millis)
    pub materialized_at_millis: i64,
}

impl MaterializedResource {
    /// Handle string, ready to assign to an element
    pub fn url(&self) -> &str {
        self.handle.url()
    }

    /// Payload size in bytes
    pub fn size(&self) -> u64 {
        self.digest.size
    }
}
