use crate::traits::{ByteReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use leadrelay_core::{MetadataTags, QuotaSnapshot, StoredFile};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "memory://leadrelay";

/// A file held by [`InMemoryStorage`].
#[derive(Debug, Clone)]
pub struct MemoryFile {
    pub name: String,
    pub data: Bytes,
    pub properties: BTreeMap<String, String>,
}

#[derive(Default)]
struct Inner {
    files: HashMap<String, MemoryFile>,
    stored_bytes: u64,
}

/// In-process storage backend
///
/// Keeps files in a map and accounts usage against a configured limit. Faults can be
/// injected per file name, on the quota read, or as latency on every create, and the
/// number of remote calls is counted so callers can assert on backend traffic.
pub struct InMemoryStorage {
    limit: Option<u64>,
    base_used: u64,
    base_url: String,
    state: Mutex<Inner>,
    failing_names: HashSet<String>,
    quota_failure: bool,
    create_delay: Option<Duration>,
    quota_calls: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryStorage {
    /// Storage with the given limit in bytes and nothing used.
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            base_used: 0,
            base_url: DEFAULT_BASE_URL.to_string(),
            state: Mutex::new(Inner::default()),
            failing_names: HashSet::new(),
            quota_failure: false,
            create_delay: None,
            quota_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Storage that reports no limit.
    pub fn unlimited() -> Self {
        Self {
            limit: None,
            ..Self::new(0)
        }
    }

    /// Usage already present before any file is stored.
    pub fn with_used(mut self, used: u64) -> Self {
        self.base_used = used;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Reject every create for a file with this name.
    pub fn fail_on(mut self, name: impl Into<String>) -> Self {
        self.failing_names.insert(name.into());
        self
    }

    /// Make every quota read fail.
    pub fn fail_quota(mut self) -> Self {
        self.quota_failure = true;
        self
    }

    /// Sleep this long inside every create call.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn quota_calls(&self) -> usize {
        self.quota_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    pub fn get(&self, id: &str) -> Option<MemoryFile> {
        self.lock().files.get(id).cloned()
    }

    /// Names of the files currently stored, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().files.values().map(|f| f.name.clone()).collect();
        names.sort();
        names
    }

    /// Bytes in use, including the preset usage.
    pub fn used(&self) -> u64 {
        self.base_used + self.lock().stored_bytes
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get_quota(&self) -> StorageResult<QuotaSnapshot> {
        self.quota_calls.fetch_add(1, Ordering::SeqCst);

        if self.quota_failure {
            return Err(StorageError::QuotaUnavailable(
                "injected quota failure".to_string(),
            ));
        }

        let used = self.used();
        Ok(match self.limit {
            Some(limit) => QuotaSnapshot::new(limit, used),
            None => QuotaSnapshot::unlimited(used),
        })
    }

    async fn create_file(
        &self,
        name: &str,
        _content_length: u64,
        mut reader: ByteReader,
        tags: &MetadataTags,
    ) -> StorageResult<StoredFile> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read content of {}: {}", name, e))
        })?;

        if self.failing_names.contains(name) {
            return Err(StorageError::UploadFailed(format!(
                "injected create failure for {}",
                name
            )));
        }

        let size = data.len() as u64;
        let id = Uuid::new_v4().to_string();
        {
            let mut inner = self.lock();
            if let Some(limit) = self.limit {
                if self.base_used + inner.stored_bytes + size > limit {
                    return Err(StorageError::UploadFailed(format!(
                        "storage limit of {} bytes exceeded by {}",
                        limit, name
                    )));
                }
            }
            inner.stored_bytes += size;
            inner.files.insert(
                id.clone(),
                MemoryFile {
                    name: name.to_string(),
                    data: Bytes::from(data),
                    properties: tags.to_properties(),
                },
            );
        }

        tracing::debug!(file_id = %id, file_name = %name, size_bytes = size, "In-memory create");

        Ok(StoredFile {
            download_link: format!("{}/{}", self.base_url, id),
            id,
        })
    }

    async fn delete_file(&self, id: &str) -> StorageResult<()> {
        let result = {
            let mut inner = self.lock();
            match inner.files.remove(id) {
                Some(file) => {
                    inner.stored_bytes -= file.data.len() as u64;
                    Ok(())
                }
                None => Err(StorageError::NotFound(id.to_string())),
            }
        };
        // Counted once the removal is visible, so waiting on the count is enough.
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tags() -> MetadataTags {
        MetadataTags {
            lead: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            mobile: "+61412345678".to_string(),
        }
    }

    fn reader(data: &'static [u8]) -> ByteReader {
        Box::pin(Cursor::new(data))
    }

    #[tokio::test]
    async fn test_create_and_delete_track_usage() {
        let storage = InMemoryStorage::new(100).with_used(10);
        let tags = tags();

        let stored = storage
            .create_file("a.txt", 5, reader(b"hello"), &tags)
            .await
            .unwrap();
        assert!(stored.download_link.ends_with(&stored.id));
        assert_eq!(storage.used(), 15);
        assert_eq!(storage.get_quota().await.unwrap(), QuotaSnapshot::new(100, 15));

        let file = storage.get(&stored.id).unwrap();
        assert_eq!(file.name, "a.txt");
        assert_eq!(file.properties["lead"], tags.lead.to_string());

        storage.delete_file(&stored.id).await.unwrap();
        assert_eq!(storage.used(), 10);
        assert_eq!(storage.file_count(), 0);
        assert_eq!(storage.create_calls(), 1);
        assert_eq!(storage.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let storage = InMemoryStorage::new(100).fail_on("bad.pdf").fail_quota();

        assert!(matches!(
            storage.get_quota().await,
            Err(StorageError::QuotaUnavailable(_))
        ));
        assert!(storage
            .create_file("bad.pdf", 3, reader(b"bad"), &tags())
            .await
            .is_err());
        assert_eq!(storage.file_count(), 0);
        assert_eq!(storage.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_rejected_over_limit() {
        let storage = InMemoryStorage::new(4);
        let result = storage.create_file("big", 5, reader(b"hello"), &tags()).await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }

    #[tokio::test]
    async fn test_unlimited_reports_max_limit() {
        let storage = InMemoryStorage::unlimited().with_used(7);
        let quota = storage.get_quota().await.unwrap();
        assert_eq!(quota.limit, u64::MAX);
        assert_eq!(quota.used, 7);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let storage = InMemoryStorage::default();
        assert!(matches!(
            storage.delete_file("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
