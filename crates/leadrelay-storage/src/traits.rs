//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use leadrelay_core::{MetadataTags, QuotaSnapshot, StoredFile};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Quota query failed: {0}")]
    QuotaUnavailable(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file id: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte stream handed to [`Storage::create_file`].
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Storage abstraction trait
///
/// The upload pipeline treats every error as an opaque failure; the variants only
/// matter for logging.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the current usage and limit.
    async fn get_quota(&self) -> StorageResult<QuotaSnapshot>;

    /// Store one file, tagged with the batch metadata.
    ///
    /// `content_length` is the size announced by the client; the reader is consumed until EOF.
    async fn create_file(
        &self,
        name: &str,
        content_length: u64,
        reader: ByteReader,
        tags: &MetadataTags,
    ) -> StorageResult<StoredFile>;

    /// Delete a previously created file by id.
    async fn delete_file(&self, id: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
