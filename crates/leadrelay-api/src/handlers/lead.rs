//! Lead capture endpoint
//!
//! Parses the multipart form, validates the contact fields, uploads attachments as one
//! all-or-nothing batch and hands the final enquiry to the notifier.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use leadrelay_core::constants::FILES_FIELD;
use leadrelay_core::models::LeadResponse;
use leadrelay_core::{AppError, Enquiry};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::{CancellationToken, DropGuard};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{multipart_error, ErrorResponse, HttpAppError};
use crate::services::email::spawn_notification;
use crate::services::upload::{FileContent, FileSubmission};
use crate::state::AppState;

/// Multipart body of `POST /lead`, for the API documentation.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct LeadForm {
    email: String,
    /// E.164, e.g. `+61412345678`
    mobile: String,
    first_name: String,
    last_name: String,
    enquiry: String,
    /// Zero or more attachments
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Option<Vec<Vec<u8>>>,
}

/// Text fields and attachments read from the form.
#[derive(Default)]
struct LeadFormData {
    fields: HashMap<String, String>,
    files: Vec<FileSubmission>,
}

impl LeadFormData {
    fn field(&self, name: &str) -> String {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    fn enquiry(&self) -> Enquiry {
        Enquiry::new(
            self.field("email"),
            self.field("mobile"),
            self.field("firstName"),
            self.field("lastName"),
            self.field("enquiry"),
        )
    }
}

/// Where an attachment's bytes accumulate while the part is read.
enum Spool {
    Memory(Vec<u8>),
    Disk {
        file: tokio::fs::File,
        path: tempfile::TempPath,
    },
}

impl Spool {
    async fn write(&mut self, chunk: &Bytes, max_memory: u64) -> Result<(), AppError> {
        if let Spool::Memory(buf) = self {
            if (buf.len() + chunk.len()) as u64 <= max_memory {
                buf.extend_from_slice(chunk);
                return Ok(());
            }
            let (std_file, path) = tempfile::NamedTempFile::new()?.into_parts();
            let mut file = tokio::fs::File::from_std(std_file);
            file.write_all(buf).await?;
            *self = Spool::Disk { file, path };
        }

        if let Spool::Disk { file, .. } = self {
            file.write_all(chunk).await?;
        }
        Ok(())
    }

    async fn finish(self) -> Result<FileContent, AppError> {
        match self {
            Spool::Memory(buf) => Ok(FileContent::Memory(Bytes::from(buf))),
            Spool::Disk { mut file, path } => {
                file.flush().await?;
                Ok(FileContent::Spooled(path))
            }
        }
    }
}

async fn read_file(
    mut field: Field<'_>,
    index: usize,
    name: String,
    max_memory: u64,
) -> Result<FileSubmission, AppError> {
    let mut spool = Spool::Memory(Vec::new());
    let mut size = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        size += chunk.len() as u64;
        spool.write(&chunk, max_memory).await?;
    }

    let content = spool.finish().await?;
    if matches!(content, FileContent::Spooled(_)) {
        tracing::debug!(file_index = index, file_name = %name, size_bytes = size, "Attachment spooled to disk");
    }

    Ok(FileSubmission {
        index,
        name,
        size,
        content,
    })
}

async fn read_form(mut multipart: Multipart, max_memory: u64) -> Result<LeadFormData, AppError> {
    let mut form = LeadFormData::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == FILES_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let index = form.files.len();
            let mut file = read_file(field, index, file_name, max_memory).await?;
            // Browsers send an empty part when no file was chosen.
            if file.name.is_empty() && file.size == 0 {
                continue;
            }
            if file.name.is_empty() {
                file.name = format!("attachment-{}", index + 1);
            }
            form.files.push(file);
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Request token cancelled once `timeout` elapses or when the guard drops.
fn request_deadline(timeout: Duration) -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let deadline = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "Upload deadline exceeded");
                deadline.cancel();
            }
            _ = deadline.cancelled() => {}
        }
    });
    let guard = token.clone().drop_guard();
    (token, guard)
}

async fn process_lead(state: &AppState, multipart: Multipart) -> Result<LeadResponse, AppError> {
    let form = read_form(multipart, state.config.max_upload_memory_bytes()).await?;
    let enquiry = form.enquiry();
    enquiry.validate()?;

    tracing::info!(
        lead_id = %enquiry.lead_id,
        attachments = form.files.len(),
        "Lead received"
    );

    let (request, _deadline_guard) =
        request_deadline(Duration::from_secs(state.config.upload_timeout_secs()));
    let processed = state
        .attachments
        .process(&enquiry, form.files, &request)
        .await?;

    let response = LeadResponse {
        lead_id: enquiry.lead_id,
        enquiry: processed.text.clone(),
        attached_files: processed.links.len(),
    };

    if let Some(notifier) = &state.notifier {
        spawn_notification(notifier.clone(), enquiry, processed.text);
    }

    Ok(response)
}

/// Submit a lead with optional attachments
#[utoipa::path(
    post,
    path = "/lead",
    tag = "leads",
    request_body(content = LeadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Lead accepted", body = LeadResponse),
        (status = 400, description = "Invalid form fields", body = ErrorResponse),
        (status = 413, description = "Request too large", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse),
        (status = 500, description = "Storage unavailable or upload failed", body = ErrorResponse),
        (status = 507, description = "Storage quota reached", body = ErrorResponse)
    )
)]
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<LeadResponse>, HttpAppError> {
    process_lead(&state, multipart)
        .await
        .map(Json)
        .map_err(|e| HttpAppError::new(e, state.config.is_production()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spool_stays_in_memory_under_threshold() {
        let mut spool = Spool::Memory(Vec::new());
        spool.write(&Bytes::from_static(b"abc"), 4).await.unwrap();
        spool.write(&Bytes::from_static(b"d"), 4).await.unwrap();
        assert!(matches!(spool.finish().await.unwrap(), FileContent::Memory(b) if b == "abcd"));
    }

    #[tokio::test]
    async fn test_spool_moves_to_disk_over_threshold() {
        let mut spool = Spool::Memory(Vec::new());
        spool.write(&Bytes::from_static(b"abc"), 4).await.unwrap();
        spool.write(&Bytes::from_static(b"de"), 4).await.unwrap();

        let FileContent::Spooled(path) = spool.finish().await.unwrap() else {
            panic!("expected spooled content");
        };
        assert_eq!(std::fs::read(&path).unwrap(), b"abcde");
    }

    #[test]
    fn test_form_fields_are_trimmed() {
        let mut form = LeadFormData::default();
        form.fields.insert("email".to_string(), "  jane@example.com ".to_string());
        form.fields.insert("firstName".to_string(), "Jane".to_string());

        let enquiry = form.enquiry();
        assert_eq!(enquiry.email, "jane@example.com");
        assert_eq!(enquiry.first_name, "Jane");
        assert_eq!(enquiry.last_name, "");
    }

    #[tokio::test]
    async fn test_deadline_cancels_token() {
        let (token, _guard) = request_deadline(Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropping_guard_cancels_token() {
        let (token, guard) = request_deadline(Duration::from_secs(60));
        drop(guard);
        assert!(token.is_cancelled());
    }
}
