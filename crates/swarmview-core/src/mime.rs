//! MIME classification
//!
//! The payload's MIME type decides how the display layer renders it. The
//! class is computed once when a payload is materialized.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fallback MIME type for payloads we cannot identify
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Rendering class of a materialized payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MimeClass {
    /// `image/*`: replace the element's source directly
    Image,
    /// `application/pdf`: embed as a document, optionally downloadable
    Pdf,
    /// `video/*`: attach as a streaming source with playback controls
    Video,
    /// Anything else; rendered like an image
    Unknown,
}

impl MimeClass {
    /// Classify a MIME type string
    pub fn from_mime(mime: &str) -> Self {
        let essence = essence(mime);
        if essence == "application/pdf" {
            MimeClass::Pdf
        } else if essence.starts_with("image/") {
            MimeClass::Image
        } else if essence.starts_with("video/") {
            MimeClass::Video
        } else {
            MimeClass::Unknown
        }
    }
}

impl fmt::Display for MimeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MimeClass::Image => "image",
            MimeClass::Pdf => "pdf",
            MimeClass::Video => "video",
            MimeClass::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Guess a MIME type from a file name's extension
pub fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(mime)
}

/// Classify a payload from its declared type, falling back to the extension
///
/// A declared type wins unless it is blank or the generic octet-stream type.
/// Returns the class and the MIME type that was settled on.
pub fn classify(declared: Option<&str>, file_name: &str) -> (MimeClass, String) {
    let declared = declared
        .map(essence)
        .filter(|m| !m.is_empty() && *m != OCTET_STREAM);

    let mime = match declared {
        Some(mime) => mime,
        None => mime_from_extension(file_name)
            .unwrap_or(OCTET_STREAM)
            .to_string(),
    };

    (MimeClass::from_mime(&mime), mime)
}

/// Whether a video container can be attached as a streaming source
pub fn is_streamable_video(mime: &str) -> bool {
    matches!(
        essence(mime).as_str(),
        "video/mp4" | "video/webm" | "video/ogg" | "video/x-matroska" | "video/x-m4v"
    )
}

/// Lower-cased MIME type without parameters
fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
