//! Concurrent multi-file upload with quota enforcement and all-or-nothing rollback
//!
//! Files are admitted in input order against a running usage total seeded from the
//! quota snapshot. Each admitted file is uploaded by its own task; the first failure,
//! quota exhaustion or the request deadline cancels the batch, and every file that
//! did reach the backend is then deleted again.

use std::sync::Arc;

use leadrelay_core::{MetadataTags, QuotaSnapshot, StoredFile};
use leadrelay_storage::Storage;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::types::{FileSubmission, UploadBatchError, UploadLink, UploadOutcome};
use super::worker::UploadWorker;

/// Why a batch was stopped. The first cause wins, except that a failure or a quota hit
/// replaces a plain cancellation recorded before it.
#[derive(Debug)]
enum AbortCause {
    Quota {
        projected: u64,
        limit: u64,
        file_index: usize,
    },
    Failure(String),
    Cancelled,
}

/// Worker results of one batch.
///
/// Once the batch is aborted every upload is deleted as soon as it is known, so files
/// are not left behind while slower workers are still running.
struct BatchResult {
    storage: Arc<dyn Storage>,
    succeeded: Vec<(usize, StoredFile)>,
    aborted: Option<AbortCause>,
    rolled_back: usize,
}

impl BatchResult {
    fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            succeeded: Vec::new(),
            aborted: None,
            rolled_back: 0,
        }
    }

    fn abort(&mut self, cause: AbortCause) {
        let replace = match &self.aborted {
            None => true,
            Some(AbortCause::Cancelled) => !matches!(cause, AbortCause::Cancelled),
            Some(_) => false,
        };
        if !replace {
            return;
        }

        let first = self.aborted.is_none();
        self.aborted = Some(cause);
        if first {
            for (index, file) in std::mem::take(&mut self.succeeded) {
                self.roll_back(index, file);
            }
        }
    }

    fn uploaded(&mut self, index: usize, file: StoredFile) {
        if self.aborted.is_some() {
            self.roll_back(index, file);
        } else {
            self.succeeded.push((index, file));
        }
    }

    /// Delete an uploaded file in a detached task. Failures are logged, never retried.
    fn roll_back(&mut self, index: usize, file: StoredFile) {
        self.rolled_back += 1;
        let storage = self.storage.clone();
        tokio::spawn(async move {
            match storage.delete_file(&file.id).await {
                Ok(()) => {
                    tracing::info!(file_index = index, file_id = %file.id, "Rolled back upload")
                }
                Err(e) => tracing::error!(
                    file_index = index,
                    file_id = %file.id,
                    error = %e,
                    "Failed to roll back upload"
                ),
            }
        });
    }

    fn finish(self) -> Result<Vec<UploadLink>, UploadBatchError> {
        let rolled_back = self.rolled_back;
        match self.aborted {
            None => {
                let mut links: Vec<UploadLink> = self
                    .succeeded
                    .into_iter()
                    .map(|(index, file)| UploadLink {
                        index,
                        id: file.id,
                        download_link: file.download_link,
                    })
                    .collect();
                links.sort_by_key(|link| link.index);
                Ok(links)
            }
            Some(AbortCause::Quota {
                projected,
                limit,
                file_index,
            }) => Err(UploadBatchError::QuotaExceeded {
                projected,
                limit,
                file_index,
            }),
            Some(AbortCause::Failure(reason)) => {
                Err(UploadBatchError::PartialFailure { reason, rolled_back })
            }
            Some(AbortCause::Cancelled) => Err(UploadBatchError::PartialFailure {
                reason: "request cancelled or deadline exceeded".to_string(),
                rolled_back,
            }),
        }
    }
}

pub struct UploadOrchestrator {
    storage: Arc<dyn Storage>,
}

impl UploadOrchestrator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Upload every submission or none of them.
    ///
    /// `request` is the request-scoped token; the batch runs under a child of it, so a
    /// request deadline stops workers that have not started yet. Links come back in
    /// input order.
    ///
    /// The batch runs in its own task. Dropping the returned future abandons the batch:
    /// workers that have not started are skipped and every upload is rolled back.
    pub async fn run(
        &self,
        submissions: Vec<FileSubmission>,
        quota: QuotaSnapshot,
        tags: MetadataTags,
        request: &CancellationToken,
    ) -> Result<Vec<UploadLink>, UploadBatchError> {
        if submissions.is_empty() {
            return Ok(Vec::new());
        }

        let abandoned = CancellationToken::new();
        let guard = abandoned.clone().drop_guard();
        let batch = tokio::spawn(run_batch(
            self.storage.clone(),
            submissions,
            quota,
            Arc::new(tags),
            request.child_token(),
            abandoned,
        ));

        let joined = batch.await;
        guard.disarm();
        joined.unwrap_or_else(|join_error| {
            tracing::error!(error = %join_error, "Upload batch task did not complete");
            Err(UploadBatchError::PartialFailure {
                reason: format!("upload batch task: {}", join_error),
                rolled_back: 0,
            })
        })
    }
}

async fn run_batch(
    storage: Arc<dyn Storage>,
    submissions: Vec<FileSubmission>,
    quota: QuotaSnapshot,
    tags: Arc<MetadataTags>,
    batch: CancellationToken,
    abandoned: CancellationToken,
) -> Result<Vec<UploadLink>, UploadBatchError> {
    let total = submissions.len();
    let mut result = BatchResult::new(storage.clone());
    let mut workers = JoinSet::new();
    let mut projected = quota.used;

    for submission in submissions {
        if batch.is_cancelled() {
            result.abort(AbortCause::Cancelled);
            break;
        }

        // A sum that overflows u64 is past any limit.
        projected = projected.checked_add(submission.size).unwrap_or(u64::MAX);
        if projected >= quota.limit {
            tracing::warn!(
                file_index = submission.index,
                projected,
                limit = quota.limit,
                "Storage quota reached, stopping dispatch"
            );
            result.abort(AbortCause::Quota {
                projected,
                limit: quota.limit,
                file_index: submission.index,
            });
            batch.cancel();
            break;
        }

        let worker = UploadWorker::new(storage.clone(), tags.clone(), batch.clone());
        workers.spawn(worker.upload(submission));
    }

    let dispatched = workers.len();
    tracing::debug!(dispatched, total, "Upload workers dispatched");

    loop {
        let joined = tokio::select! {
            joined = workers.join_next() => joined,
            _ = abandoned.cancelled(), if result.aborted.is_none() => {
                tracing::warn!("Upload batch abandoned by caller, rolling back");
                batch.cancel();
                result.abort(AbortCause::Cancelled);
                continue;
            }
        };
        let Some(joined) = joined else {
            break;
        };

        match joined {
            Ok(UploadOutcome::Uploaded { index, file }) => result.uploaded(index, file),
            Ok(UploadOutcome::Failed { index, reason }) => {
                batch.cancel();
                result.abort(AbortCause::Failure(format!("file {}: {}", index, reason)));
            }
            Ok(UploadOutcome::Skipped { .. }) => result.abort(AbortCause::Cancelled),
            Err(join_error) => {
                tracing::error!(error = %join_error, "Upload worker did not complete");
                batch.cancel();
                result.abort(AbortCause::Failure(format!("worker task: {}", join_error)));
            }
        }
    }

    result.finish()
}
