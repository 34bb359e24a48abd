//! Media identifiers
//!
//! A [`MediaId`] is the opaque key a display element carries to request
//! media. The ledger keeps separate tables for still media and videos, so
//! the identifier also records which namespace it belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ledger namespace a media identifier is looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MediaNamespace {
    /// Images and documents (banners, inline pictures, PDFs)
    #[default]
    Image,
    /// Videos
    Video,
}

impl fmt::Display for MediaNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaNamespace::Image => write!(f, "image"),
            MediaNamespace::Video => write!(f, "video"),
        }
    }
}

/// Opaque key used by the display layer to request media
///
/// Assigned by the authoring flow and treated as read-only here, e.g.
/// `"42.png"` for a post banner or a numeric id for a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId {
    namespace: MediaNamespace,
    key: String,
}

impl MediaId {
    /// Create an identifier in the given namespace
    pub fn new(namespace: MediaNamespace, key: impl Into<String>) -> Self {
        Self {
            namespace,
            key: key.into(),
        }
    }

    /// Create an identifier in the image namespace
    pub fn image(key: impl Into<String>) -> Self {
        Self::new(MediaNamespace::Image, key)
    }

    /// Create an identifier in the video namespace
    pub fn video(key: impl Into<String>) -> Self {
        Self::new(MediaNamespace::Video, key)
    }

    /// The raw key as stored on the element
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The ledger namespace
    pub fn namespace(&self) -> MediaNamespace {
        self.namespace
    }

    /// Whether the key is blank (such elements are never bound)
    pub fn is_blank(&self) -> bool {
        self.key.trim().is_empty()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            MediaNamespace::Image => write!(f, "{}", self.key),
            MediaNamespace::Video => write!(f, "video:{}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_distinct() {
        let image = MediaId::image("7");
        let video = MediaId::video("7");
        assert_ne!(image, video);
        assert_eq!(image.key(), video.key());
        assert_eq!(video.namespace(), MediaNamespace::Video);
    }

    #[test]
    fn test_display() {
        assert_eq!(MediaId::image("42.png").to_string(), "42.png");
        assert_eq!(MediaId::video("3").to_string(), "video:3");
    }

    #[test]
    fn test_blank() {
        assert!(MediaId::image("  ").is_blank());
        assert!(!MediaId::image("1.png").is_blank());
    }
}
