use std::sync::Arc;

use leadrelay_core::QuotaSnapshot;
use leadrelay_storage::Storage;

use super::types::UploadBatchError;

/// Reads the storage budget once per batch.
pub struct QuotaTracker {
    storage: Arc<dyn Storage>,
}

impl QuotaTracker {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn fetch(&self) -> Result<QuotaSnapshot, UploadBatchError> {
        let snapshot = self.storage.get_quota().await.map_err(|e| {
            tracing::error!(error = %e, backend = %self.storage.backend_type(), "Quota query failed");
            UploadBatchError::BackendUnavailable(e)
        })?;

        tracing::debug!(
            limit = snapshot.limit,
            used = snapshot.used,
            remaining = snapshot.remaining(),
            "Storage quota fetched"
        );
        Ok(snapshot)
    }
}
