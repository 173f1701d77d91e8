//! Paths, header names and limits of the write API.

/// Prefix of every key-scoped write route.
pub const WRITE_ITEMS_PATH: &str = "/api/write/items/";

/// Route probed after a failed request to detect an expired session.
pub const WRITE_ROOT_PATH: &str = "/api/write/";

/// Files at or above this size go through the multipart protocol.
pub const PART_SIZE_LIMIT: u64 = 100_000_000;

/// Maximum number of part uploads in flight for a single file.
pub const MAX_CONCURRENT_PARTS: usize = 2;

/// Reserved key prefix for objects that belong to the drive itself.
pub const SYSTEM_PREFIX: &str = "_$flaredrive$/";

/// Directory (inside [`SYSTEM_PREFIX`]) holding content-addressed thumbnails.
pub const THUMBNAIL_DIR: &str = "thumbnails/";

/// Side length, in pixels, of a rendered thumbnail.
pub const THUMBNAIL_SIZE: u32 = 144;

/// Content type of rendered thumbnails.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/png";

/// Header carrying the thumbnail digest of an uploaded file.
pub const THUMBNAIL_HEADER: &str = "fd-thumbnail";

/// Header naming the source key of a server-side copy.
pub const COPY_SOURCE_HEADER: &str = "x-amz-copy-source";

/// Content type that marks a key as a directory.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

/// Fallback content type for files of unknown type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Response header holding the identifier of a stored part.
pub const ETAG_HEADER: &str = "etag";

/// Query flag requesting a multipart upload.
pub const UPLOADS_QUERY: &str = "uploads";

/// Query parameter naming the multipart upload.
pub const UPLOAD_ID_QUERY: &str = "uploadId";

/// Query parameter naming a part (1-based).
pub const PART_NUMBER_QUERY: &str = "partNumber";

/// Returns the storage key of the thumbnail with the given digest.
pub fn thumbnail_key(digest: &str) -> String {
    format!("{SYSTEM_PREFIX}{THUMBNAIL_DIR}{digest}.png")
}
