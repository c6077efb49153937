use crate::{DriveStorage, InMemoryStorage, LocalStorage, Storage, StorageBackend, StorageError, StorageResult};
use leadrelay_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        StorageBackend::Drive => {
            let token = config.drive_access_token().ok_or_else(|| {
                StorageError::ConfigError("DRIVE_ACCESS_TOKEN not configured".to_string())
            })?;

            let storage = DriveStorage::new(config.drive_api_url(), config.drive_upload_url(), token)?;
            Ok(Arc::new(storage))
        }

        StorageBackend::Local => {
            let base_path = config
                .local_storage_path()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
                })?;
            let base_url = config
                .local_storage_base_url()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
                })?;

            let storage =
                LocalStorage::new(base_path, base_url, config.local_storage_limit_bytes()).await?;
            Ok(Arc::new(storage))
        }

        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; attachments are lost on restart");
            Ok(Arc::new(InMemoryStorage::new(
                config.memory_storage_limit_bytes(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_memory_storage() {
        let storage = create_storage(&config(&[
            ("STORAGE_BACKEND", "memory"),
            ("MEMORY_STORAGE_LIMIT_MB", "1"),
        ]))
        .await
        .unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Memory);
        assert_eq!(storage.get_quota().await.unwrap().limit, 1024 * 1024);
    }

    #[tokio::test]
    async fn test_create_local_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        let storage = create_storage(&config(&[
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", &path),
            ("LOCAL_STORAGE_BASE_URL", "http://localhost/files"),
        ]))
        .await
        .unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
    }

    #[tokio::test]
    async fn test_create_drive_storage() {
        let storage = create_storage(&config(&[("DRIVE_ACCESS_TOKEN", "token")]))
            .await
            .unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Drive);
    }
}
