//! The transfer queue and its drain loop.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use flaredrive_protocol::{MediaKind, THUMBNAIL_CONTENT_TYPE};
use flaredrive_transfer::{ChunkedTransferEngine, FileHandle, ProgressCallback, ThumbnailRecord};
use flaredrive_write_api::{ObjectHeaders, WriteApiClient};
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::RenderError;
use crate::render::ThumbnailRenderer;
use crate::types::{QueueConfig, QueueEvent, TaskId, TaskReport, TaskState, TransferTask};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// FIFO of pending uploads, processed one file at a time.
///
/// Cloning yields another handle to the same queue. Producers may enqueue at
/// any time, including while a drain is running.
#[derive(Clone)]
pub struct TransferQueue {
    inner: Arc<Shared>,
}

struct Shared {
    engine: ChunkedTransferEngine,
    renderer: Arc<dyn ThumbnailRenderer>,
    config: QueueConfig,
    pending: Mutex<VecDeque<(TaskId, TransferTask)>>,
    next_id: AtomicU64,
    /// Held for the whole of one drain pass.
    drain_guard: tokio::sync::Mutex<()>,
    /// Digests already stored by this queue. Never pruned; it lives as long
    /// as the queue, normally the whole process.
    stored_thumbnails: Mutex<HashSet<String>>,
    wake: Notify,
    events_tx: mpsc::Sender<QueueEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<QueueEvent>>>,
}

impl TransferQueue {
    pub fn new(
        client: WriteApiClient,
        renderer: Arc<dyn ThumbnailRenderer>,
        config: QueueConfig,
    ) -> Self {
        Self::with_engine(ChunkedTransferEngine::new(client), renderer, config)
    }

    pub fn with_engine(
        engine: ChunkedTransferEngine,
        renderer: Arc<dyn ThumbnailRenderer>,
        config: QueueConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Shared {
                engine,
                renderer,
                config,
                pending: Mutex::new(VecDeque::new()),
                next_id: AtomicU64::new(1),
                drain_guard: tokio::sync::Mutex::new(()),
                stored_thumbnails: Mutex::new(HashSet::new()),
                wake: Notify::new(),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
            }),
        }
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are dropped when the receiver falls behind; processing never
    /// waits on it.
    pub fn take_events(&self) -> Option<mpsc::Receiver<QueueEvent>> {
        self.inner.events_rx.lock().unwrap().take()
    }

    /// Appends a task to the tail of the queue.
    pub fn enqueue(&self, task: TransferTask) -> TaskId {
        let id = TaskId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let key = task.key();
        self.inner.pending.lock().unwrap().push_back((id, task));
        debug!(task = %id, key = %key, "task queued");
        self.emit(QueueEvent::State {
            id,
            key,
            state: TaskState::Queued,
        });
        self.inner.wake.notify_one();
        id
    }

    /// Number of tasks waiting.
    pub fn len(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the head task and processes it fully.
    ///
    /// Returns `None` without waiting if the queue is empty. Drains never
    /// overlap: a second caller waits for the running pass to finish.
    pub async fn drain_once(&self) -> Option<TaskReport> {
        let _guard = self.inner.drain_guard.lock().await;
        let (id, task) = self.pop()?;
        Some(self.process(id, task).await)
    }

    /// Drains until the queue is empty, yielding to the runtime between
    /// tasks.
    pub async fn drain_all(&self) -> Vec<TaskReport> {
        let mut reports = Vec::new();
        while let Some(report) = self.drain_once().await {
            reports.push(report);
            tokio::task::yield_now().await;
        }
        reports
    }

    /// Worker loop: drains whenever tasks arrive until `cancel` fires.
    ///
    /// Cancellation is observed between tasks; a running upload is not
    /// interrupted.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("transfer queue worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.drain_once().await {
                Some(_) => tokio::task::yield_now().await,
                None => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.inner.wake.notified() => {}
                    }
                }
            }
        }
        info!("transfer queue worker stopped");
    }

    fn pop(&self) -> Option<(TaskId, TransferTask)> {
        self.inner.pending.lock().unwrap().pop_front()
    }

    fn emit(&self, event: QueueEvent) {
        let _ = self.inner.events_tx.try_send(event);
    }

    fn set_state(&self, id: TaskId, key: &str, state: TaskState) {
        self.emit(QueueEvent::State {
            id,
            key: key.to_string(),
            state,
        });
    }

    async fn process(&self, id: TaskId, task: TransferTask) -> TaskReport {
        let key = task.key();
        let file = Arc::clone(&task.file);

        let kind = MediaKind::classify(file.media_type());
        let thumbnail = if self.inner.config.thumbnails && kind.wants_thumbnail() {
            self.set_state(id, &key, TaskState::Thumbnailing);
            self.store_thumbnail(&key, kind, file.as_ref()).await
        } else {
            None
        };

        self.set_state(id, &key, TaskState::Uploading);
        let mut headers = ObjectHeaders::new(file.media_type());
        if let Some(digest) = &thumbnail {
            headers = headers.with_thumbnail(digest.clone());
        }

        let progress: ProgressCallback = {
            let tx = self.inner.events_tx.clone();
            let key = key.clone();
            Arc::new(move |p| {
                let _ = tx.try_send(QueueEvent::Progress {
                    id,
                    key: key.clone(),
                    loaded: p.loaded,
                    total: p.total,
                });
            })
        };

        let result = self
            .inner
            .engine
            .upload(&key, file, &headers, Some(progress))
            .await;

        let (state, error) = match result {
            Ok(outcome) => {
                info!(task = %id, key = %key, outcome = ?outcome, "upload finished");
                (TaskState::Done, None)
            }
            Err(e) => {
                error!(task = %id, key = %key, error = %e, "upload failed");
                if let Some(location) = self.inner.engine.client().recover_session().await {
                    self.emit(QueueEvent::SessionRedirect { location });
                }
                (TaskState::Failed, Some(e.to_string()))
            }
        };
        self.set_state(id, &key, state);

        TaskReport {
            id,
            key,
            state,
            thumbnail,
            error,
        }
    }

    /// Renders and stores the thumbnail, returning its digest. Every failure
    /// yields `None`.
    async fn store_thumbnail(
        &self,
        key: &str,
        kind: MediaKind,
        file: &dyn FileHandle,
    ) -> Option<String> {
        let rendered = match kind {
            MediaKind::Video => {
                let limit = self.inner.config.render_timeout;
                match tokio::time::timeout(limit, self.inner.renderer.render(file)).await {
                    Ok(result) => result,
                    Err(_) => Err(RenderError::Timeout(limit)),
                }
            }
            _ => self.inner.renderer.render(file).await,
        };

        let bytes = match rendered {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "thumbnail render failed, uploading without");
                return None;
            }
        };

        let record = ThumbnailRecord::new(bytes);
        if self
            .inner
            .stored_thumbnails
            .lock()
            .unwrap()
            .contains(&record.digest)
        {
            debug!(key = %key, digest = %record.digest, "thumbnail already stored");
            return Some(record.digest);
        }

        let thumb_key = record.key();
        let ThumbnailRecord { digest, bytes } = record;
        let headers = ObjectHeaders::new(THUMBNAIL_CONTENT_TYPE);
        match self
            .inner
            .engine
            .client()
            .put_object(&thumb_key, Bytes::from(bytes), &headers, None)
            .await
        {
            Ok(()) => {
                debug!(key = %key, digest = %digest, "thumbnail stored");
                self.inner
                    .stored_thumbnails
                    .lock()
                    .unwrap()
                    .insert(digest.clone());
                Some(digest)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "thumbnail upload failed, uploading without");
                None
            }
        }
    }
}
