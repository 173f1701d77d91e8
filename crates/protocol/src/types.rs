use std::path::Path;

use crate::DEFAULT_CONTENT_TYPE;

/// The video type the thumbnail pipeline knows how to sample.
pub const THUMBNAIL_VIDEO_TYPE: &str = "video/mp4";

/// The document type the thumbnail pipeline knows how to render.
pub const THUMBNAIL_DOCUMENT_TYPE: &str = "application/pdf";

/// Thumbnail eligibility of a declared media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Document,
    /// No thumbnail is attempted.
    Other,
}

impl MediaKind {
    /// Classifies a media type such as `image/png` or `video/mp4`.
    pub fn classify(media_type: &str) -> Self {
        let media_type = media_type.trim().to_ascii_lowercase();
        if media_type.starts_with("image/") {
            MediaKind::Image
        } else if media_type == THUMBNAIL_VIDEO_TYPE {
            MediaKind::Video
        } else if media_type == THUMBNAIL_DOCUMENT_TYPE {
            MediaKind::Document
        } else {
            MediaKind::Other
        }
    }

    /// Returns `true` if a thumbnail should be rendered for this kind.
    pub fn wants_thumbnail(self) -> bool {
        !matches!(self, MediaKind::Other)
    }
}

/// Detects a MIME content type from a file name extension.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn detect_content_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("mp4") => THUMBNAIL_VIDEO_TYPE,
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("pdf") => THUMBNAIL_DOCUMENT_TYPE,
        Some("txt" | "log") => "text/plain",
        Some("md") => "text/markdown",
        Some("html" | "htm") => "text/html",
        Some("json") => "application/json",
        Some("zip") => "application/zip",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
