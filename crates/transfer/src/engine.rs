//! Single-PUT and multipart upload of one file.

use std::sync::Arc;

use bytes::Bytes;
use flaredrive_protocol::{MAX_CONCURRENT_PARTS, PART_SIZE_LIMIT};
use flaredrive_write_api::{ObjectHeaders, WriteApiClient};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::TransferError;
use crate::chunked::PartPlan;
use crate::file::FileHandle;
use crate::progress::{PartProgress, ProgressCallback};
use crate::types::UploadSession;

/// How a file was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// One PUT with the whole body.
    Direct { size: u64 },
    /// Multipart upload assembled from `parts` parts.
    Multipart { upload_id: String, parts: u32 },
}

/// Uploads files, switching to the multipart protocol at the size limit.
#[derive(Clone)]
pub struct ChunkedTransferEngine {
    client: WriteApiClient,
    part_size: u64,
    max_concurrent_parts: usize,
}

impl ChunkedTransferEngine {
    pub fn new(client: WriteApiClient) -> Self {
        Self {
            client,
            part_size: PART_SIZE_LIMIT,
            max_concurrent_parts: MAX_CONCURRENT_PARTS,
        }
    }

    /// Shrinks the part size so tests can drive the multipart path with
    /// small files.
    #[cfg(any(test, feature = "test-util"))]
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    pub fn client(&self) -> &WriteApiClient {
        &self.client
    }

    /// Uploads `file` under `key`.
    ///
    /// Any failed request fails the whole transfer; nothing is retried.
    pub async fn upload(
        &self,
        key: &str,
        file: Arc<dyn FileHandle>,
        headers: &ObjectHeaders,
        progress: Option<ProgressCallback>,
    ) -> Result<UploadOutcome, TransferError> {
        let size = file.size();
        if size < self.part_size {
            self.upload_direct(key, file.as_ref(), headers, progress).await
        } else {
            self.upload_multipart(key, file, headers, progress).await
        }
    }

    async fn upload_direct(
        &self,
        key: &str,
        file: &dyn FileHandle,
        headers: &ObjectHeaders,
        progress: Option<ProgressCallback>,
    ) -> Result<UploadOutcome, TransferError> {
        let size = file.size();
        let body = file.read_range(0, size).await?;
        let tracker = PartProgress::new(vec![size], progress);

        self.client
            .put_object(key, Bytes::from(body), headers, Some(tracker.sent_callback(0)))
            .await?;
        tracker.complete(0);

        debug!(key = %key, size, "direct upload complete");
        Ok(UploadOutcome::Direct { size })
    }

    async fn upload_multipart(
        &self,
        key: &str,
        file: Arc<dyn FileHandle>,
        headers: &ObjectHeaders,
        progress: Option<ProgressCallback>,
    ) -> Result<UploadOutcome, TransferError> {
        let upload_id = self.client.initiate_multipart(key, headers).await?;

        let plan = PartPlan::with_part_size(file.size(), self.part_size);
        let mut session = UploadSession::new(key, upload_id.clone(), plan.part_count());
        let tracker = PartProgress::new(plan.parts().map(|p| p.len()).collect(), progress);
        let gate = Arc::new(Semaphore::new(self.max_concurrent_parts));
        let mut tasks: JoinSet<Result<(u32, String), TransferError>> = JoinSet::new();

        debug!(
            key = %key,
            upload_id = %upload_id,
            parts = plan.part_count(),
            "multipart upload initiated"
        );

        let result = async {
            for part in plan.parts() {
                // Wait for a free slot, collecting finished parts meanwhile.
                let permit = loop {
                    tokio::select! {
                        biased;
                        Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                            let (part_number, etag) = flatten(joined)?;
                            session.record_part(part_number, etag)?;
                        }
                        permit = Arc::clone(&gate).acquire_owned() => {
                            break permit.map_err(|e| TransferError::TaskFailed(e.to_string()))?;
                        }
                    }
                };

                // Read before spawning so requests go out in admission order.
                let body = file.read_range(part.start, part.end).await?;
                let client = self.client.clone();
                let tracker = Arc::clone(&tracker);
                let key = key.to_string();
                let upload_id = upload_id.clone();
                let index = (part.part_number - 1) as usize;

                tasks.spawn(async move {
                    let _permit = permit;
                    let etag = client
                        .upload_part(
                            &key,
                            &upload_id,
                            part.part_number,
                            Bytes::from(body),
                            Some(tracker.sent_callback(index)),
                        )
                        .await?;
                    tracker.complete(index);
                    Ok((part.part_number, etag))
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let (part_number, etag) = flatten(joined)?;
                session.record_part(part_number, etag)?;
            }
            Ok::<(), TransferError>(())
        }
        .await;

        if let Err(e) = result {
            // No new parts start; parts already on the wire run to completion
            // before the failure is reported.
            while tasks.join_next().await.is_some() {}
            return Err(e);
        }

        let parts = session.completed_parts()?;
        self.client
            .complete_multipart(key, &upload_id, &parts)
            .await?;

        info!(key = %key, parts = parts.len(), "multipart upload complete");
        Ok(UploadOutcome::Multipart {
            upload_id,
            parts: plan.part_count(),
        })
    }
}

fn flatten(
    joined: Result<Result<(u32, String), TransferError>, tokio::task::JoinError>,
) -> Result<(u32, String), TransferError> {
    joined.map_err(|e| TransferError::TaskFailed(e.to_string()))?
}
