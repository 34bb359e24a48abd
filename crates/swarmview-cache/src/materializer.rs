//! Payload materialization
//!
//! Turns a swarm file into a [`MaterializedResource`]: read the bytes through
//! whichever extraction primitive the file exposes, classify the MIME type,
//! and publish the buffer under a local handle.
//!
//! Swarm clients disagree on how bytes are handed out, so extraction goes
//! through the [`ByteSource`] capability. [`byte_source`] picks the adapter
//! once per file; nothing downstream branches on the primitive.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use swarmview_core::{
    AsyncBuffer, CallbackBuffer, ContentLocator, FileReader, MediaError, MimeClass, SwarmError,
    SwarmFile, classify, is_streamable_video,
};
use tokio::sync::oneshot;
use tracing::{debug, instrument};

use crate::handle::HandleRegistry;
use crate::resource::{ContentDigest, MaterializedResource};

/// Capability to read a whole file into memory
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Read all bytes
    async fn extract_bytes(&self) -> Result<Bytes, SwarmError>;
}

/// Adapter over the callback-based primitive
pub struct CallbackSource {
    inner: Arc<dyn CallbackBuffer>,
}

impl CallbackSource {
    /// Wrap a callback-based reader
    pub fn new(inner: Arc<dyn CallbackBuffer>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ByteSource for CallbackSource {
    async fn extract_bytes(&self) -> Result<Bytes, SwarmError> {
        let (tx, rx) = oneshot::channel();
        self.inner.get_buffer(Box::new(move |result| {
            // The receiver is gone only if the fetch was abandoned
            let _ = tx.send(result);
        }));
        rx.await
            .map_err(|_| SwarmError::extraction("callback dropped without a result"))?
    }
}

/// Adapter over the future-based primitive
pub struct AsyncSource {
    inner: Arc<dyn AsyncBuffer>,
}

impl AsyncSource {
    /// Wrap a future-based reader
    pub fn new(inner: Arc<dyn AsyncBuffer>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ByteSource for AsyncSource {
    async fn extract_bytes(&self) -> Result<Bytes, SwarmError> {
        self.inner.buffer().await
    }
}

/// Select the adapter for a file's extraction primitive
pub fn byte_source(reader: FileReader) -> Box<dyn ByteSource> {
    match reader {
        FileReader::Callback(inner) => Box::new(CallbackSource::new(inner)),
        FileReader::Async(inner) => Box::new(AsyncSource::new(inner)),
    }
}

/// Converts swarm files into published, classified resources
#[derive(Debug, Clone)]
pub struct Materializer {
    handles: Arc<HandleRegistry>,
}

impl Materializer {
    /// Create a materializer publishing into `handles`
    pub fn new(handles: Arc<HandleRegistry>) -> Self {
        Self { handles }
    }

    /// The registry handles are published into
    pub fn handles(&self) -> &Arc<HandleRegistry> {
        &self.handles
    }

    /// Read, classify and publish one file
    ///
    /// Fails with [`MediaError::Materialization`] when the bytes cannot be
    /// read, the buffer is empty, or a video uses a container that cannot be
    /// streamed. No handle is registered on failure.
    #[instrument(skip(self, locator, file), fields(hash = %locator.short_hash(), file = file.name()))]
    pub async fn materialize(
        &self,
        locator: &ContentLocator,
        file: &dyn SwarmFile,
    ) -> Result<MaterializedResource, MediaError> {
        let bytes = byte_source(file.reader())
            .extract_bytes()
            .await
            .map_err(|e| MediaError::materialization(locator.as_str(), e.to_string()))?;

        if bytes.is_empty() {
            return Err(MediaError::materialization(
                locator.as_str(),
                "payload is empty",
            ));
        }

        let (mime_class, mime_type) = classify(file.declared_type(), file.name());
        if mime_class == MimeClass::Video && !is_streamable_video(&mime_type) {
            return Err(MediaError::materialization(
                locator.as_str(),
                format!("unsupported video container {mime_type}"),
            ));
        }

        let digest = ContentDigest::from_data(&bytes);
        let handle = self.handles.create(bytes);

        debug!(
            class = %mime_class,
            mime = %mime_type,
            digest = %digest,
            handle = %handle,
            "Materialized payload"
        );

        Ok(MaterializedResource {
            handle,
            mime_class,
            mime_type,
            file_name: file.name().to_string(),
            digest,
            source: locator.clone(),
            materialized_at_millis: chrono::Utc::now().timestamp_millis(),
        })
    }
}
