//! Upload queue for the file manager.
//!
//! Tasks are processed strictly one at a time in enqueue order. Each task
//! optionally renders a thumbnail, stores it under its SHA-1 digest and then
//! uploads the file through the transfer engine.

mod error;
mod queue;
mod render;
mod types;

pub use error::RenderError;
pub use queue::TransferQueue;
pub use render::{ImageThumbnailRenderer, RenderFuture, ThumbnailRenderer};
pub use types::{
    QueueConfig, QueueEvent, TaskId, TaskReport, TaskState, TransferTask, VIDEO_RENDER_TIMEOUT,
};
