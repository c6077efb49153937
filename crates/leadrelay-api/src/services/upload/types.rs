//! Types flowing through the upload pipeline

use bytes::Bytes;
use leadrelay_core::StoredFile;
use leadrelay_storage::{ByteReader, StorageError};
use std::io::Cursor;
use tempfile::TempPath;

/// File content held between form parsing and upload.
#[derive(Debug)]
pub enum FileContent {
    /// Small files stay in memory
    Memory(Bytes),
    /// Large files are spooled to a temp file, removed when the submission is dropped
    Spooled(TempPath),
}

impl FileContent {
    /// Open the content as a byte stream.
    pub async fn open(&self) -> std::io::Result<ByteReader> {
        match self {
            FileContent::Memory(bytes) => Ok(Box::pin(Cursor::new(bytes.clone()))),
            FileContent::Spooled(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(Box::pin(file))
            }
        }
    }
}

/// One attachment of a lead, consumed by exactly one worker.
#[derive(Debug)]
pub struct FileSubmission {
    /// Position in the submitted file list
    pub index: usize,
    pub name: String,
    pub size: u64,
    pub content: FileContent,
}

impl FileSubmission {
    pub fn in_memory(index: usize, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            index,
            name: name.into(),
            size: data.len() as u64,
            content: FileContent::Memory(data),
        }
    }
}

/// Why a worker could not upload its file.
#[derive(Debug, thiserror::Error)]
pub enum FailureReason {
    #[error("failed to open content: {0}")]
    OpenError(#[source] std::io::Error),

    #[error("backend rejected upload: {0}")]
    BackendError(#[source] StorageError),
}

/// The single report of one worker.
#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded { index: usize, file: StoredFile },
    Failed { index: usize, reason: FailureReason },
    /// Cancelled before the remote call; nothing was done.
    Skipped { index: usize },
}

impl UploadOutcome {
    pub fn index(&self) -> usize {
        match self {
            UploadOutcome::Uploaded { index, .. }
            | UploadOutcome::Failed { index, .. }
            | UploadOutcome::Skipped { index } => *index,
        }
    }
}

/// A successfully uploaded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLink {
    pub index: usize,
    pub id: String,
    pub download_link: String,
}

/// Why a batch did not complete. No partial success is ever reported.
#[derive(Debug, thiserror::Error)]
pub enum UploadBatchError {
    #[error("storage quota could not be read: {0}")]
    BackendUnavailable(#[source] StorageError),

    #[error("file {file_index} brings projected usage to {projected} bytes, limit is {limit}")]
    QuotaExceeded {
        projected: u64,
        limit: u64,
        file_index: usize,
    },

    #[error("batch aborted ({reason}), {rolled_back} uploaded file(s) rolled back")]
    PartialFailure { reason: String, rolled_back: usize },
}
