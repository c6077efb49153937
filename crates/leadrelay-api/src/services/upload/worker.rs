use std::sync::Arc;

use leadrelay_core::MetadataTags;
use leadrelay_storage::Storage;
use tokio_util::sync::CancellationToken;

use super::types::{FailureReason, FileSubmission, UploadOutcome};

/// Uploads a single file and reports exactly one outcome.
///
/// Cancellation is only observed before the remote call. A failure cancels the batch
/// but never deletes anything; rollback belongs to the orchestrator.
#[derive(Clone)]
pub struct UploadWorker {
    storage: Arc<dyn Storage>,
    tags: Arc<MetadataTags>,
    cancel: CancellationToken,
}

impl UploadWorker {
    pub fn new(
        storage: Arc<dyn Storage>,
        tags: Arc<MetadataTags>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            storage,
            tags,
            cancel,
        }
    }

    pub async fn upload(self, submission: FileSubmission) -> UploadOutcome {
        let index = submission.index;

        if self.cancel.is_cancelled() {
            tracing::debug!(file_index = index, "Batch cancelled, skipping upload");
            return UploadOutcome::Skipped { index };
        }

        let reader = match submission.content.open().await {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(
                    file_index = index,
                    file_name = %submission.name,
                    error = %e,
                    "Failed to open attachment"
                );
                self.cancel.cancel();
                return UploadOutcome::Failed {
                    index,
                    reason: FailureReason::OpenError(e),
                };
            }
        };

        tracing::debug!(
            file_index = index,
            file_name = %submission.name,
            size_bytes = submission.size,
            "Uploading attachment"
        );

        // The submission stays alive until here so a spooled temp file outlives the read.
        match self
            .storage
            .create_file(&submission.name, submission.size, reader, &self.tags)
            .await
        {
            Ok(file) => {
                tracing::info!(
                    file_index = index,
                    file_name = %submission.name,
                    file_id = %file.id,
                    "Attachment uploaded"
                );
                UploadOutcome::Uploaded { index, file }
            }
            Err(e) => {
                tracing::warn!(
                    file_index = index,
                    file_name = %submission.name,
                    error = %e,
                    "Attachment upload failed"
                );
                self.cancel.cancel();
                UploadOutcome::Failed {
                    index,
                    reason: FailureReason::BackendError(e),
                }
            }
        }
    }
}
