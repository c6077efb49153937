//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything convertible into
//! `AppError` renders through the same status/body/logging path.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use leadrelay_core::{AppError, ErrorMetadata, LogLevel};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::upload::UploadBatchError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Field-level validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

/// Wrapper type for AppError to implement IntoResponse
#[derive(Debug)]
pub struct HttpAppError {
    pub error: AppError,
    /// Hide details regardless of sensitivity
    pub production: bool,
}

impl HttpAppError {
    pub fn new(error: AppError, production: bool) -> Self {
        Self { error, production }
    }
}

impl From<AppError> for HttpAppError {
    fn from(error: AppError) -> Self {
        Self::new(error, false)
    }
}

/// Map a multipart read failure; an exceeded body limit surfaces here as well.
pub fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(format!("Invalid multipart form: {}", err.body_text()))
    }
}

impl From<UploadBatchError> for AppError {
    fn from(err: UploadBatchError) -> Self {
        match err {
            UploadBatchError::BackendUnavailable(source) => {
                AppError::StorageUnavailable(source.to_string())
            }
            UploadBatchError::QuotaExceeded {
                projected, limit, ..
            } => AppError::StorageQuotaExceeded { projected, limit },
            err @ UploadBatchError::PartialFailure { .. } => AppError::UploadFailed(err.to_string()),
        }
    }
}

impl From<UploadBatchError> for HttpAppError {
    fn from(err: UploadBatchError) -> Self {
        AppError::from(err).into()
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error.detailed_message(), error_type = error_type, "Error occurred");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.error;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let fields = Some(app_error.field_errors().to_vec()).filter(|f| !f.is_empty());
        let hide_details = self.production || app_error.is_sensitive();

        let body = Json(ErrorResponse {
            error: app_error.client_message(),
            details: (!hide_details).then(|| app_error.detailed_message()),
            error_type: (!hide_details).then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
            fields,
        });

        let mut response = (status, body).into_response();
        if let AppError::RateLimited { retry_after_secs } = app_error {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}
