//! Attachment processing for one lead
//!
//! quota → fan-out upload → merge links into the enquiry text

use std::sync::Arc;

use leadrelay_core::Enquiry;
use leadrelay_storage::Storage;
use tokio_util::sync::CancellationToken;

use super::enquiry::merge;
use super::orchestrator::UploadOrchestrator;
use super::quota::QuotaTracker;
use super::types::{FileSubmission, UploadBatchError, UploadLink};

/// Final enquiry text together with the links it lists.
#[derive(Debug)]
pub struct ProcessedEnquiry {
    pub text: String,
    pub links: Vec<UploadLink>,
}

pub struct AttachmentService {
    quota: QuotaTracker,
    orchestrator: UploadOrchestrator,
}

impl AttachmentService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            quota: QuotaTracker::new(storage.clone()),
            orchestrator: UploadOrchestrator::new(storage),
        }
    }

    /// Upload the attachments of `enquiry` and return its final text.
    ///
    /// Without attachments the backend is not contacted at all.
    pub async fn process(
        &self,
        enquiry: &Enquiry,
        submissions: Vec<FileSubmission>,
        request: &CancellationToken,
    ) -> Result<ProcessedEnquiry, UploadBatchError> {
        if submissions.is_empty() {
            return Ok(ProcessedEnquiry {
                text: enquiry.enquiry.clone(),
                links: Vec::new(),
            });
        }

        let quota = self.quota.fetch().await?;
        let links = self
            .orchestrator
            .run(submissions, quota, enquiry.metadata_tags(), request)
            .await?;

        tracing::info!(
            lead_id = %enquiry.lead_id,
            attached_files = links.len(),
            "Attachments uploaded"
        );

        Ok(ProcessedEnquiry {
            text: merge(&enquiry.enquiry, links.iter().map(|l| &l.download_link)),
            links,
        })
    }
}
