//! Chunked file transfer into the object store.
//!
//! Files below [`PART_SIZE_LIMIT`](flaredrive_protocol::PART_SIZE_LIMIT) are
//! sent with one PUT; larger files are split into fixed-size parts uploaded
//! at most [`MAX_CONCURRENT_PARTS`](flaredrive_protocol::MAX_CONCURRENT_PARTS)
//! at a time and then assembled server-side.

mod chunked;
mod engine;
mod file;
mod hash;
mod progress;
mod types;

pub use chunked::{PartDescriptor, PartPlan};
pub use engine::{ChunkedTransferEngine, UploadOutcome};
pub use file::{FileHandle, LocalFile, MemoryFile, ReadFuture};
pub use hash::{digest_bytes, digest_file};
pub use progress::{PartProgress, ProgressCallback, TransferProgress};
pub use types::{ThumbnailRecord, UploadSession};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] flaredrive_write_api::ApiError),

    #[error("part {part_number} recorded twice")]
    DuplicatePart { part_number: u32 },

    #[error("part {part_number} outside 1..={parts}")]
    PartOutOfRange { part_number: u32, parts: u32 },

    #[error("expected {expected} parts, recorded {recorded}")]
    IncompleteParts { expected: u32, recorded: u32 },

    #[error("part task failed: {0}")]
    TaskFailed(String),
}
