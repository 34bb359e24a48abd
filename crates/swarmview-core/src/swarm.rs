//! Swarm transport collaborator
//!
//! The swarm serves content by locator instead of by server address. This
//! module only describes the surface the cache consumes; the protocol itself
//! lives in an external client.
//!
//! Swarm client implementations differ in how they hand out file bytes:
//! some call back with a buffer, others return a future. [`FileReader`]
//! names both primitives so the materializer can adapt either one.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SwarmError;
use crate::locator::ContentLocator;

/// Completion callback for [`CallbackBuffer::get_buffer`]
pub type BufferCallback = Box<dyn FnOnce(Result<Bytes, SwarmError>) + Send + 'static>;

/// Callback-based byte extraction primitive
pub trait CallbackBuffer: Send + Sync {
    /// Read the whole file and invoke `done` exactly once with the result
    fn get_buffer(&self, done: BufferCallback);
}

/// Future-based byte extraction primitive
#[async_trait]
pub trait AsyncBuffer: Send + Sync {
    /// Read the whole file
    async fn buffer(&self) -> Result<Bytes, SwarmError>;
}

/// The extraction primitive a swarm file exposes
#[derive(Clone)]
pub enum FileReader {
    Callback(Arc<dyn CallbackBuffer>),
    Async(Arc<dyn AsyncBuffer>),
}

impl fmt::Debug for FileReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileReader::Callback(_) => f.write_str("FileReader::Callback"),
            FileReader::Async(_) => f.write_str("FileReader::Async"),
        }
    }
}

/// A file inside an active download
pub trait SwarmFile: Send + Sync {
    /// File name within the download
    fn name(&self) -> &str;

    /// MIME type declared by the transport, if any
    fn declared_type(&self) -> Option<&str>;

    /// File length in bytes
    fn length(&self) -> u64;

    /// The byte extraction primitive for this file
    fn reader(&self) -> FileReader;
}

/// An active download
///
/// `ready()` resolves once the swarm reports the content is available, but
/// the file list may still be empty at that point and fill in later.
#[async_trait]
pub trait SwarmTorrent: Send + Sync {
    /// Content hash of the download
    fn info_hash(&self) -> String;

    /// Wait until the swarm reports the content as available
    async fn ready(&self) -> Result<(), SwarmError>;

    /// Files currently known for the download
    fn files(&self) -> Vec<Arc<dyn SwarmFile>>;
}

/// Swarm client: add, query and drop downloads by locator
pub trait SwarmClient: Send + Sync {
    /// Start (or join) the download for `locator`
    ///
    /// Idempotent: adding a locator that is already active returns the
    /// existing handle instead of starting a second download.
    fn add(&self, locator: &ContentLocator) -> Result<Arc<dyn SwarmTorrent>, SwarmError>;

    /// The active download for `locator`, if any
    fn get(&self, locator: &ContentLocator) -> Option<Arc<dyn SwarmTorrent>>;

    /// Drop the active download for `locator`
    ///
    /// Returns whether a download was removed. A later `add` starts fresh.
    fn remove(&self, locator: &ContentLocator) -> bool;
}
