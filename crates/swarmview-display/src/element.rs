//! Display elements
//!
//! [`Element`] is a detached description used to build content before it is
//! inserted; [`Node`] is the stored snapshot of an element that lives in a
//! [`DisplayTree`](crate::DisplayTree).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use swarmview_core::MediaId;

/// Attribute names understood by the binder
pub mod attr {
    /// Media id in the image namespace
    pub const MEDIA_ID: &str = "data-magnet-id";
    /// Media id in the video namespace
    pub const VIDEO_ID: &str = "data-video-id";
    /// Set to `"true"` once the element has been bound
    pub const LOADED: &str = "data-magnet-loaded";
    /// Request a download link next to embedded documents
    pub const DOWNLOADABLE: &str = "data-downloadable";
    pub const SRC: &str = "src";
    pub const HREF: &str = "href";
    pub const DOWNLOAD: &str = "download";
    pub const TYPE: &str = "type";
    pub const CONTROLS: &str = "controls";
    pub const AUTOPLAY: &str = "autoplay";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
}

/// Identifier of an element inside one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub(crate) u64);

impl ElementId {
    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of display element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ElementKind {
    /// Groups other elements
    #[default]
    Container,
    /// Image, also the usual placeholder for media
    Image,
    /// Embedded document
    Embed,
    /// Streaming video
    Video,
    /// Link
    Anchor,
}

impl ElementKind {
    /// Markup tag name
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Container => "div",
            ElementKind::Image => "img",
            ElementKind::Embed => "embed",
            ElementKind::Video => "video",
            ElementKind::Anchor => "a",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Detached element description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Empty container
    pub fn container() -> Self {
        Self::new(ElementKind::Container)
    }

    /// Image placeholder requesting media `id`
    pub fn image(id: impl Into<String>) -> Self {
        Self::new(ElementKind::Image).with_attr(attr::MEDIA_ID, id)
    }

    /// Video placeholder requesting video `id`
    pub fn video(id: impl Into<String>) -> Self {
        Self::new(ElementKind::Video).with_attr(attr::VIDEO_ID, id)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Mark the element as wanting a download link
    pub fn downloadable(self) -> Self {
        self.with_attr(attr::DOWNLOADABLE, "true")
    }
}

/// Stored snapshot of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: ElementId,
    pub kind: ElementKind,
    pub attrs: BTreeMap<String, String>,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
}

impl Node {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    fn flag(&self, name: &str) -> bool {
        matches!(self.attr(name), Some(v) if v != "false")
    }

    /// Media this element requests, if any
    ///
    /// A video id takes precedence over an image id. Blank ids count as
    /// absent.
    pub fn media_id(&self) -> Option<MediaId> {
        let non_blank = |name| self.attr(name).map(str::trim).filter(|v| !v.is_empty());
        if let Some(id) = non_blank(attr::VIDEO_ID) {
            return Some(MediaId::video(id));
        }
        non_blank(attr::MEDIA_ID).map(MediaId::image)
    }

    /// Whether the element has already been bound
    pub fn is_loaded(&self) -> bool {
        self.attr(attr::LOADED) == Some("true")
    }

    pub fn is_downloadable(&self) -> bool {
        self.flag(attr::DOWNLOADABLE)
    }

    /// Element carrying a media id and not yet bound
    pub fn is_eligible(&self) -> bool {
        !self.is_loaded() && self.media_id().is_some()
    }
}

/// An element paired with the media it requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundElement {
    pub element: ElementId,
    pub media: MediaId,
    pub loaded: bool,
}
