//! Wire constants and payload types for the FlareDrive write API.
//!
//! Shared by the HTTP client, the transfer engine and the upload queue so
//! that every path, header name and size threshold lives in one place.

pub mod constants;
pub mod messages;
pub mod types;

pub use constants::*;
pub use messages::{CompletedPart, InitiateMultipartResponse};
pub use types::{MediaKind, THUMBNAIL_DOCUMENT_TYPE, THUMBNAIL_VIDEO_TYPE, detect_content_type};
