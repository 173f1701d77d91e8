//! Write API error types.

/// Errors produced by the write API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("write API returned {status} for {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response for part {part_number} carried no etag")]
    MissingEtag { part_number: u32 },

    #[error("invalid folder name: {0:?}")]
    InvalidFolderName(String),

    #[error("invalid header {0}")]
    InvalidHeader(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// Returns `true` for errors raised before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::InvalidFolderName(_))
    }
}
