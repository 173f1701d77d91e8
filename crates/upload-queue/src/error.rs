use std::time::Duration;

/// Thumbnail rendering failures. Always absorbed by the queue.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no renderer for media type {0}")]
    Unsupported(String),

    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for RenderError {
    fn from(e: image::ImageError) -> Self {
        RenderError::Decode(e.to_string())
    }
}
