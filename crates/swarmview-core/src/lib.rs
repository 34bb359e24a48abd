//! # Swarmview Core
//!
//! Core types, collaborator traits, and errors for the swarmview media
//! resolution cache.
//!
//! This crate provides the vocabulary shared by the cache and display
//! layers, and the seams where the external collaborators plug in: the
//! ledger (media id to locator lookup) and the peer swarm (locator to bytes).
//!
//! ## Key Traits
//!
//! - [`LedgerClient`]: Read-only media id to content locator lookup
//! - [`SwarmClient`]: Add/get/remove downloads by content locator
//! - [`SwarmTorrent`]: An active download with a lazily populated file list
//! - [`SwarmFile`]: A file inside a download, exposing one of two byte
//!   extraction primitives ([`FileReader`])
//!
//! ## Key Types
//!
//! - [`MediaId`]: Opaque key a display element uses to request media
//! - [`ContentLocator`]: Magnet-style content-addressed locator
//! - [`MimeClass`]: Rendering class derived from a payload's MIME type
//! - [`MediaError`]: Error taxonomy surfaced to the display layer

pub mod error;
pub mod ledger;
pub mod locator;
pub mod media;
pub mod mime;
pub mod mock;
pub mod swarm;

// Re-export main types
pub use error::*;
pub use ledger::*;
pub use locator::*;
pub use media::*;
pub use mime::*;
pub use mock::*;
pub use swarm::*;
