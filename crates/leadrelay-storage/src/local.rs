use crate::traits::{ByteReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use leadrelay_core::{MetadataTags, QuotaSnapshot, StoredFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

const SIDECAR_EXTENSION: &str = "json";

/// Properties stored next to each file.
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    name: String,
    size: u64,
    properties: BTreeMap<String, String>,
}

/// Local filesystem storage implementation
///
/// Each file is stored as `{base_path}/{id}` with its name and properties in
/// `{base_path}/{id}.json`. Usage is the sum of stored file sizes.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    limit: u64,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/leadrelay/files")
    /// * `base_url` - Base URL the files are served from (e.g., "http://localhost/files")
    /// * `limit` - Quota in bytes
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        limit: u64,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            limit,
        })
    }

    /// Resolve a file id to its path. Ids are always UUIDs, which rules out traversal.
    fn id_to_path(&self, id: &str) -> StorageResult<PathBuf> {
        let id = Uuid::parse_str(id)
            .map_err(|_| StorageError::InvalidKey(format!("not a file id: {}", id)))?;
        Ok(self.base_path.join(id.to_string()))
    }

    fn sidecar_path(path: &std::path::Path) -> PathBuf {
        path.with_extension(SIDECAR_EXTENSION)
    }

    /// Generate public URL for file
    fn generate_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), id)
    }

    async fn used_bytes(&self) -> StorageResult<u64> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut total = 0u64;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == SIDECAR_EXTENSION) {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() {
                total += meta.len();
            }
        }
        Ok(total)
    }

    async fn remove_if_exists(path: &std::path::Path) -> std::io::Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn get_quota(&self) -> StorageResult<QuotaSnapshot> {
        let used = self.used_bytes().await.map_err(|e| {
            StorageError::QuotaUnavailable(format!(
                "Failed to scan {}: {}",
                self.base_path.display(),
                e
            ))
        })?;
        Ok(QuotaSnapshot::new(self.limit, used))
    }

    async fn create_file(
        &self,
        name: &str,
        _content_length: u64,
        mut reader: ByteReader,
        tags: &MetadataTags,
    ) -> StorageResult<StoredFile> {
        let id = Uuid::new_v4().to_string();
        let path = self.id_to_path(&id)?;
        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let written = match tokio::io::copy(&mut reader, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = Self::remove_if_exists(&path).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let sidecar = Sidecar {
            name: name.to_string(),
            size: written,
            properties: tags.to_properties(),
        };
        let json = serde_json::to_vec_pretty(&sidecar)
            .map_err(|e| StorageError::UploadFailed(format!("Failed to encode properties: {}", e)))?;
        fs::write(Self::sidecar_path(&path), json).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write properties for {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::info!(
            path = %path.display(),
            file_id = %id,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredFile {
            download_link: self.generate_url(&id),
            id,
        })
    }

    async fn delete_file(&self, id: &str) -> StorageResult<()> {
        let path = self.id_to_path(id)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(id.to_string()));
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;
        Self::remove_if_exists(&Self::sidecar_path(&path))
            .await
            .map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete properties of {}: {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::info!(path = %path.display(), file_id = %id, "Local storage delete successful");

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
