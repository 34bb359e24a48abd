//! # Swarmview Cache
//!
//! Locator resolution, deduplicated swarm fetching, payload materialization
//! and the in-memory resolution cache.
//!
//! ## Features
//!
//! - **LocatorResolver**: One ledger round trip per media id, no memoization
//! - **FetchCoordinator**: At most one swarm download per locator in flight;
//!   every concurrent requester receives the same outcome
//! - **Materializer**: Reads a swarm file through either extraction primitive,
//!   classifies it and publishes it under a local handle
//! - **ResolutionCache**: Locator to resource map, never stale because
//!   locators are content addressed
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use swarmview_cache::{CacheConfig, FetchCoordinator};
//! use swarmview_core::{ContentLocator, MockFile, MockSwarm};
//!
//! #[tokio::main]
//! async fn main() {
//!     let swarm = Arc::new(MockSwarm::new());
//!     swarm.seed("magnet:?xt=urn:btih:AAA", MockFile::new("7.png", b"png".to_vec()));
//!
//!     let coordinator = FetchCoordinator::new(CacheConfig::default(), swarm);
//!     let locator = ContentLocator::parse("magnet:?xt=urn:btih:AAA").unwrap();
//!
//!     let resource = coordinator.fetch(&locator).await.unwrap();
//!     println!("{} -> {}", locator, resource.url());
//! }
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod handle;
pub mod materializer;
pub mod resolver;
pub mod resource;

// Re-exports
pub use cache::ResolutionCache;
pub use config::{
    CacheConfig, DEFAULT_FETCH_TIMEOUT, DEFAULT_FILE_POLL_INTERVAL, DEFAULT_HANDLE_PREFIX,
};
pub use coordinator::{CoordinatorStats, FetchCoordinator, FetchOutcome};
pub use handle::{HandleRegistry, ResourceHandle};
pub use materializer::{AsyncSource, ByteSource, CallbackSource, Materializer, byte_source};
pub use resolver::LocatorResolver;
pub use resource::{ContentDigest, MaterializedResource};
