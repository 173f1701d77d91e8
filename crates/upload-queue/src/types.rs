use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use flaredrive_transfer::FileHandle;
use flaredrive_write_api::object_key;

/// Upper bound on rendering a video thumbnail.
pub const VIDEO_RENDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifier assigned to a task on enqueue. Monotonic per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A file waiting to be uploaded into `base_directory`.
#[derive(Clone)]
pub struct TransferTask {
    pub base_directory: String,
    pub file: Arc<dyn FileHandle>,
}

impl TransferTask {
    pub fn new(base_directory: impl Into<String>, file: Arc<dyn FileHandle>) -> Self {
        Self {
            base_directory: base_directory.into(),
            file,
        }
    }

    /// Object key the file is stored under.
    pub fn key(&self) -> String {
        object_key(&self.base_directory, self.file.name())
    }
}

impl fmt::Debug for TransferTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferTask")
            .field("base_directory", &self.base_directory)
            .field("file", &self.file.name())
            .field("size", &self.file.size())
            .finish()
    }
}

/// Lifecycle of a task. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Thumbnailing,
    Uploading,
    Done,
    Failed,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Queued => "queued",
            TaskState::Thumbnailing => "thumbnailing",
            TaskState::Uploading => "uploading",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted while the queue works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// A task entered a new state.
    State {
        id: TaskId,
        key: String,
        state: TaskState,
    },
    /// Upload progress of the running task.
    Progress {
        id: TaskId,
        key: String,
        loaded: u64,
        total: u64,
    },
    /// The recovery probe asked the host to navigate to `location`.
    SessionRedirect { location: String },
}

/// Outcome of one processed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub id: TaskId,
    pub key: String,
    pub state: TaskState,
    /// Digest of the stored thumbnail, if one was attached.
    pub thumbnail: Option<String>,
    pub error: Option<String>,
}

/// Queue settings.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Render and attach thumbnails for eligible media.
    pub thumbnails: bool,
    /// Limit applied to video rendering.
    pub render_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            thumbnails: true,
            render_timeout: VIDEO_RENDER_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flaredrive_transfer::MemoryFile;

    #[test]
    fn task_key_joins_base_directory() {
        let file = Arc::new(MemoryFile::new("cat.png", "image/png", vec![1]));
        assert_eq!(TransferTask::new("photos/", file.clone()).key(), "photos/cat.png");
        assert_eq!(TransferTask::new("", file).key(), "cat.png");
    }

    #[test]
    fn terminal_states() {
        assert!(TaskState::Done.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Uploading.is_terminal());
        assert_eq!(TaskState::Thumbnailing.to_string(), "thumbnailing");
    }

    #[test]
    fn default_config_enables_thumbnails() {
        let config = QueueConfig::default();
        assert!(config.thumbnails);
        assert_eq!(config.render_timeout, Duration::from_secs(10));
    }
}
