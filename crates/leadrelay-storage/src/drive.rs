//! Google Drive v3 backend
//!
//! Talks to the REST API directly: `about` for the quota, a `multipart/related`
//! upload for file creation, and `DELETE files/{id}` for rollback. Authentication is a
//! bearer token supplied by configuration.

use crate::traits::{ByteReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use leadrelay_core::{MetadataTags, QuotaSnapshot, StoredFile};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AboutResponse {
    storage_quota: DriveQuota,
}

/// Drive reports byte counts as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveQuota {
    limit: Option<String>,
    usage_in_drive: Option<String>,
}

#[derive(Debug, Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedFile {
    id: String,
    web_content_link: Option<String>,
}

fn parse_quota_value(field: &str, value: Option<&str>) -> StorageResult<Option<u64>> {
    value
        .map(|v| {
            v.parse::<u64>().map_err(|_| {
                StorageError::QuotaUnavailable(format!("{} is not a byte count: {}", field, v))
            })
        })
        .transpose()
}

fn quota_snapshot(quota: &DriveQuota) -> StorageResult<QuotaSnapshot> {
    let used = parse_quota_value("usageInDrive", quota.usage_in_drive.as_deref())?.unwrap_or(0);
    Ok(match parse_quota_value("limit", quota.limit.as_deref())? {
        Some(limit) => QuotaSnapshot::new(limit, used),
        None => QuotaSnapshot::unlimited(used),
    })
}

/// Opening and closing parts of a `multipart/related` upload body around the media bytes.
fn multipart_related_frame(boundary: &str, metadata_json: &str) -> (Bytes, Bytes) {
    let head = format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{json}\r\n\
         --{b}\r\nContent-Type: application/octet-stream\r\n\r\n",
        b = boundary,
        json = metadata_json
    );
    let tail = format!("\r\n--{}--\r\n", boundary);
    (Bytes::from(head), Bytes::from(tail))
}

/// Google Drive storage implementation
#[derive(Clone)]
pub struct DriveStorage {
    client: reqwest::Client,
    api_url: String,
    upload_url: String,
    access_token: String,
}

impl DriveStorage {
    pub fn new(
        api_url: impl Into<String>,
        upload_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("leadrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            upload_url: upload_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Turn a non-2xx response into an error carrying the body text.
    async fn check_status(
        response: reqwest::Response,
        to_error: fn(String) -> StorageError,
    ) -> StorageResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(to_error(format!("Drive API returned {}: {}", status, body)))
    }
}

#[async_trait]
impl Storage for DriveStorage {
    async fn get_quota(&self) -> StorageResult<QuotaSnapshot> {
        let response = self
            .client
            .get(format!("{}/about", self.api_url))
            .query(&[("fields", "storageQuota")])
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| StorageError::QuotaUnavailable(e.to_string()))?;

        let about: AboutResponse = Self::check_status(response, StorageError::QuotaUnavailable)
            .await?
            .json()
            .await
            .map_err(|e| StorageError::QuotaUnavailable(format!("Invalid about response: {}", e)))?;

        let snapshot = quota_snapshot(&about.storage_quota)?;
        tracing::debug!(
            limit = snapshot.limit,
            used = snapshot.used,
            "Drive storage quota"
        );
        Ok(snapshot)
    }

    async fn create_file(
        &self,
        name: &str,
        content_length: u64,
        reader: ByteReader,
        tags: &MetadataTags,
    ) -> StorageResult<StoredFile> {
        let start = std::time::Instant::now();
        let metadata = FileMetadata {
            name,
            properties: tags.to_properties(),
        };
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| StorageError::UploadFailed(format!("Failed to encode metadata: {}", e)))?;

        let boundary = format!("leadrelay-{}", Uuid::new_v4().simple());
        let (head, tail) = multipart_related_frame(&boundary, &metadata_json);
        let total_length = head.len() as u64 + content_length + tail.len() as u64;

        let body = stream::once(async move { Ok::<Bytes, std::io::Error>(head) })
            .chain(ReaderStream::new(reader))
            .chain(stream::once(async move { Ok(tail) }));

        let response = self
            .client
            .post(format!("{}/files", self.upload_url))
            .query(&[("uploadType", "multipart"), ("fields", "id,webContentLink")])
            .header(AUTHORIZATION, self.bearer())
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .header(CONTENT_LENGTH, total_length)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let created: CreatedFile = Self::check_status(response, StorageError::UploadFailed)
            .await?
            .json()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Invalid create response: {}", e)))?;

        let download_link = created.web_content_link.ok_or_else(|| {
            StorageError::UploadFailed(format!("Drive returned no link for file {}", created.id))
        })?;

        tracing::info!(
            file_id = %created.id,
            file_name = %name,
            size_bytes = content_length,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Drive upload successful"
        );

        Ok(StoredFile {
            id: created.id,
            download_link,
        })
    }

    async fn delete_file(&self, id: &str) -> StorageResult<()> {
        if id.is_empty() || id.contains('/') {
            return Err(StorageError::InvalidKey(id.to_string()));
        }

        let response = self
            .client
            .delete(format!("{}/files/{}", self.api_url, id))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Self::check_status(response, StorageError::DeleteFailed).await?;

        tracing::info!(file_id = %id, "Drive delete successful");
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Drive
    }
}
