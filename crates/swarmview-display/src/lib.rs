//! # Swarmview Display
//!
//! Binds media to the elements of a live display tree.
//!
//! Elements request media through a `data-magnet-id` (image namespace) or
//! `data-video-id` (video namespace) attribute. The binder resolves the id
//! through the ledger, fetches the content through the deduplicating
//! coordinator and applies it according to its class:
//!
//! - **Image**: `src` is set on the element
//! - **Pdf**: an image placeholder becomes an `embed`, with a download link
//!   next to it when the element is `data-downloadable`
//! - **Video**: the element becomes a `video` with controls and autoplay
//!
//! Bound elements carry `data-magnet-loaded="true"` and are never bound
//! again. Failures leave the placeholder untouched.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use swarmview_core::{MockFile, MockLedger, MockSwarm};
//! use swarmview_display::{Element, MediaResolver, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let ledger = Arc::new(MockLedger::new().with_media("7.png", "magnet:?xt=urn:btih:AAA"));
//!     let swarm = Arc::new(MockSwarm::new());
//!     swarm.seed("magnet:?xt=urn:btih:AAA", MockFile::new("7.png", b"png".to_vec()));
//!
//!     let resolver = MediaResolver::with_new_tree(ResolverConfig::default(), ledger, swarm);
//!     let tree = resolver.tree().clone();
//!     tree.append(tree.root(), Element::image("7.png")).unwrap();
//!
//!     let report = resolver.resolve_all_media().await;
//!     assert_eq!(report.bound, 1);
//! }
//! ```

pub mod binder;
pub mod config;
pub mod element;
pub mod error;
pub mod service;
pub mod tree;
pub mod watcher;

// Re-exports
pub use binder::{BindOutcome, DisplayBinder};
pub use config::ResolverConfig;
pub use element::{BoundElement, Element, ElementId, ElementKind, Node, attr};
pub use error::{DisplayError, DisplayResult};
pub use service::{MediaResolver, ScanReport};
pub use tree::{DEFAULT_EVENT_CAPACITY, DisplayTree, Mutation, TreeTxn};
pub use watcher::MutationWatcher;
