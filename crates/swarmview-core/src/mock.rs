//! Mock collaborators for testing
//!
//! Provides an in-memory ledger and swarm so resolution, deduplication and
//! binding logic can be exercised without a chain or real peers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use swarmview_core::{MockFile, MockLedger, MockSwarm};
//!
//! let ledger = MockLedger::new().with_media("7.png", "magnet:?xt=urn:btih:AAA");
//! let swarm = MockSwarm::new();
//! swarm.seed("magnet:?xt=urn:btih:AAA", MockFile::new("7.png", b"png bytes".to_vec()));
//!
//! // ... hand both to the resolver, then check what the swarm saw
//! assert_eq!(swarm.add_count(), 1);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::error::{LedgerError, SwarmError};
use crate::ledger::LedgerClient;
use crate::locator::ContentLocator;
use crate::swarm::{
    AsyncBuffer, BufferCallback, CallbackBuffer, FileReader, SwarmClient, SwarmFile, SwarmTorrent,
};

/// In-memory ledger
///
/// Unknown ids resolve to an empty string, like the real contract.
#[derive(Debug, Default)]
pub struct MockLedger {
    media: DashMap<String, String>,
    videos: DashMap<String, String>,
    failing: DashMap<String, LedgerError>,
    media_calls: AtomicUsize,
    video_calls: AtomicUsize,
    lookups: Mutex<Vec<String>>,
}

impl MockLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`insert_media`](Self::insert_media)
    pub fn with_media(self, id: impl Into<String>, locator: impl Into<String>) -> Self {
        self.insert_media(id, locator);
        self
    }

    /// Builder-style variant of [`insert_video`](Self::insert_video)
    pub fn with_video(self, id: impl Into<String>, locator: impl Into<String>) -> Self {
        self.insert_video(id, locator);
        self
    }

    /// Register a still-media locator
    pub fn insert_media(&self, id: impl Into<String>, locator: impl Into<String>) {
        self.media.insert(id.into(), locator.into());
    }

    /// Register a video locator
    pub fn insert_video(&self, id: impl Into<String>, locator: impl Into<String>) {
        self.videos.insert(id.into(), locator.into());
    }

    /// Make lookups of `id` (in either namespace) fail
    pub fn fail_with(&self, id: impl Into<String>, error: LedgerError) {
        self.failing.insert(id.into(), error);
    }

    /// Total lookups served
    pub fn calls(&self) -> usize {
        self.media_calls() + self.video_calls()
    }

    /// Still-media lookups served
    pub fn media_calls(&self) -> usize {
        self.media_calls.load(Ordering::SeqCst)
    }

    /// Video lookups served
    pub fn video_calls(&self) -> usize {
        self.video_calls.load(Ordering::SeqCst)
    }

    /// Looked-up ids in call order, across both namespaces
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }

    fn lookup(&self, table: &DashMap<String, String>, id: &str) -> Result<String, LedgerError> {
        if let Some(err) = self.failing.get(id) {
            return Err(err.clone());
        }
        Ok(table.get(id).map(|l| l.clone()).unwrap_or_default())
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn locator_for_media(&self, id: &str) -> Result<String, LedgerError> {
        self.media_calls.fetch_add(1, Ordering::SeqCst);
        self.lookups.lock().push(id.to_string());
        tokio::task::yield_now().await;
        self.lookup(&self.media, id)
    }

    async fn locator_for_video(&self, id: &str) -> Result<String, LedgerError> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        self.lookups.lock().push(id.to_string());
        tokio::task::yield_now().await;
        self.lookup(&self.videos, id)
    }
}

/// How a mock file hands out its bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Through [`CallbackBuffer`], completing on a spawned task
    Callback,
    /// Through [`AsyncBuffer`]
    #[default]
    Async,
}

/// A file seeded into the mock swarm
#[derive(Debug, Clone)]
pub struct MockFile {
    name: String,
    declared_type: Option<String>,
    data: Bytes,
    mode: ExtractMode,
    failure: Option<SwarmError>,
}

impl MockFile {
    /// Create a file served through the async primitive
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            data: data.into(),
            mode: ExtractMode::default(),
            failure: None,
        }
    }

    /// Set the MIME type the transport declares
    pub fn with_type(mut self, mime: impl Into<String>) -> Self {
        self.declared_type = Some(mime.into());
        self
    }

    /// Serve bytes through the callback primitive instead
    pub fn with_callback_reader(mut self) -> Self {
        self.mode = ExtractMode::Callback;
        self
    }

    /// Make byte extraction fail
    pub fn failing_extraction(mut self, error: SwarmError) -> Self {
        self.failure = Some(error);
        self
    }

    fn read(&self) -> Result<Bytes, SwarmError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.data.clone()),
        }
    }
}

impl SwarmFile for MockFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    fn length(&self) -> u64 {
        self.data.len() as u64
    }

    fn reader(&self) -> FileReader {
        match self.mode {
            ExtractMode::Callback => FileReader::Callback(Arc::new(self.clone())),
            ExtractMode::Async => FileReader::Async(Arc::new(self.clone())),
        }
    }
}

impl CallbackBuffer for MockFile {
    fn get_buffer(&self, done: BufferCallback) {
        let result = self.read();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            done(result);
        });
    }
}

#[async_trait]
impl AsyncBuffer for MockFile {
    async fn buffer(&self) -> Result<Bytes, SwarmError> {
        tokio::task::yield_now().await;
        self.read()
    }
}

/// How a seeded download behaves once added
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MockBehavior {
    /// Ready immediately with files listed
    #[default]
    Immediate,
    /// Ready immediately, but the file list stays empty for a while
    DelayedFiles(Duration),
    /// Never becomes ready
    Hang,
    /// Fails when waited on
    Fail(SwarmError),
}

#[derive(Debug, Clone, Default)]
struct Seed {
    files: Vec<MockFile>,
    behavior: MockBehavior,
}

/// An active mock download
pub struct MockTorrent {
    info_hash: String,
    files: Vec<Arc<dyn SwarmFile>>,
    behavior: MockBehavior,
    added_at: Instant,
}

#[async_trait]
impl SwarmTorrent for MockTorrent {
    fn info_hash(&self) -> String {
        self.info_hash.clone()
    }

    async fn ready(&self) -> Result<(), SwarmError> {
        match &self.behavior {
            MockBehavior::Immediate | MockBehavior::DelayedFiles(_) => Ok(()),
            MockBehavior::Hang => std::future::pending().await,
            MockBehavior::Fail(err) => Err(err.clone()),
        }
    }

    fn files(&self) -> Vec<Arc<dyn SwarmFile>> {
        match self.behavior {
            MockBehavior::DelayedFiles(delay) if self.added_at.elapsed() < delay => Vec::new(),
            _ => self.files.clone(),
        }
    }
}

/// In-memory swarm
///
/// Content is seeded per locator; adding an unseeded locator yields a
/// download that fails with [`SwarmError::NoPeers`].
#[derive(Default)]
pub struct MockSwarm {
    seeds: DashMap<String, Seed>,
    active: DashMap<ContentLocator, Arc<MockTorrent>>,
    add_calls: DashMap<String, usize>,
    add_count: AtomicUsize,
    remove_count: AtomicUsize,
}

impl MockSwarm {
    /// Create an empty swarm
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a single-file download that becomes ready immediately
    pub fn seed(&self, locator: impl Into<String>, file: MockFile) {
        self.seed_with(locator, vec![file], MockBehavior::Immediate);
    }

    /// Seed a download with explicit files and behavior
    pub fn seed_with(&self, locator: impl Into<String>, files: Vec<MockFile>, behavior: MockBehavior) {
        self.seeds.insert(locator.into(), Seed { files, behavior });
    }

    /// Change how future downloads of `locator` behave
    ///
    /// Downloads that are already active keep their behavior.
    pub fn set_behavior(&self, locator: &str, behavior: MockBehavior) {
        self.seeds.entry(locator.to_string()).or_default().behavior = behavior;
    }

    /// Total `add` invocations
    pub fn add_count(&self) -> usize {
        self.add_count.load(Ordering::SeqCst)
    }

    /// `add` invocations for one locator
    pub fn add_count_for(&self, locator: &str) -> usize {
        self.add_calls.get(locator).map_or(0, |c| *c)
    }

    /// Total `remove` invocations that dropped a download
    pub fn remove_count(&self) -> usize {
        self.remove_count.load(Ordering::SeqCst)
    }

    /// Number of active downloads
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl SwarmClient for MockSwarm {
    fn add(&self, locator: &ContentLocator) -> Result<Arc<dyn SwarmTorrent>, SwarmError> {
        self.add_count.fetch_add(1, Ordering::SeqCst);
        *self.add_calls.entry(locator.as_str().to_string()).or_default() += 1;
        trace!(hash = %locator.short_hash(), "Mock swarm add");

        let torrent = self
            .active
            .entry(locator.clone())
            .or_insert_with(|| {
                let seed = self
                    .seeds
                    .get(locator.as_str())
                    .map(|s| s.clone())
                    .unwrap_or_else(|| Seed {
                        files: Vec::new(),
                        behavior: MockBehavior::Fail(SwarmError::no_peers(locator.as_str())),
                    });
                Arc::new(MockTorrent {
                    info_hash: locator.info_hash().to_string(),
                    files: seed
                        .files
                        .into_iter()
                        .map(|f| Arc::new(f) as Arc<dyn SwarmFile>)
                        .collect(),
                    behavior: seed.behavior,
                    added_at: Instant::now(),
                })
            })
            .clone();

        Ok(torrent)
    }

    fn get(&self, locator: &ContentLocator) -> Option<Arc<dyn SwarmTorrent>> {
        self.active
            .get(locator)
            .map(|t| t.clone() as Arc<dyn SwarmTorrent>)
    }

    fn remove(&self, locator: &ContentLocator) -> bool {
        let removed = self.active.remove(locator).is_some();
        if removed {
            self.remove_count.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(s: &str) -> ContentLocator {
        ContentLocator::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_ledger_namespaces() {
        let ledger = MockLedger::new()
            .with_media("7.png", "magnet:?xt=urn:btih:AAA")
            .with_video("7", "magnet:?xt=urn:btih:VVV");

        assert_eq!(
            ledger.locator_for_media("7.png").await.unwrap(),
            "magnet:?xt=urn:btih:AAA"
        );
        assert_eq!(
            ledger.locator_for_video("7").await.unwrap(),
            "magnet:?xt=urn:btih:VVV"
        );
        assert_eq!(ledger.locator_for_media("missing").await.unwrap(), "");
        assert_eq!(ledger.media_calls(), 2);
        assert_eq!(ledger.video_calls(), 1);
    }

    #[tokio::test]
    async fn test_ledger_failure() {
        let ledger = MockLedger::new();
        ledger.fail_with("bad", LedgerError::transport("rpc down"));
        assert!(ledger.locator_for_media("bad").await.is_err());
    }

    #[tokio::test]
    async fn test_swarm_add_is_idempotent() {
        let swarm = MockSwarm::new();
        let l = locator("magnet:?xt=urn:btih:AAA");
        swarm.seed(l.as_str(), MockFile::new("a.png", b"abc".to_vec()));

        let first = swarm.add(&l).unwrap();
        let second = swarm.add(&l).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(swarm.add_count(), 2);
        assert_eq!(swarm.active_count(), 1);

        assert!(swarm.remove(&l));
        assert!(swarm.get(&l).is_none());
        assert!(!swarm.remove(&l));
        assert_eq!(swarm.remove_count(), 1);
    }

    #[tokio::test]
    async fn test_unseeded_download_fails() {
        let swarm = MockSwarm::new();
        let torrent = swarm.add(&locator("magnet:?xt=urn:btih:NOPE")).unwrap();
        assert!(matches!(torrent.ready().await, Err(SwarmError::NoPeers(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_file_listing() {
        let swarm = MockSwarm::new();
        let l = locator("magnet:?xt=urn:btih:SLOW");
        swarm.seed_with(
            l.as_str(),
            vec![MockFile::new("a.png", b"abc".to_vec())],
            MockBehavior::DelayedFiles(Duration::from_millis(200)),
        );

        let torrent = swarm.add(&l).unwrap();
        torrent.ready().await.unwrap();
        assert!(torrent.files().is_empty());

        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(torrent.files().len(), 1);
    }

    #[tokio::test]
    async fn test_callback_reader() {
        let file = MockFile::new("a.png", b"abc".to_vec()).with_callback_reader();
        let FileReader::Callback(reader) = file.reader() else {
            panic!("expected callback reader");
        };

        let (tx, rx) = tokio::sync::oneshot::channel();
        reader.get_buffer(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        assert_eq!(&rx.await.unwrap().unwrap()[..], b"abc");
    }
}
