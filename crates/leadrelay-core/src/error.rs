//! Error types module
//!
//! All errors that reach the HTTP layer are unified under the `AppError` enum. Each
//! variant self-describes its HTTP response characteristics through `ErrorMetadata`,
//! so the API crate can render them without matching on variants itself.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UPLOAD_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid field values: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Storage backend unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage quota exceeded: projected usage {projected} bytes reaches limit of {limit} bytes")]
    StorageQuotaExceeded { projected: u64, limit: u64 },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(crate::models::enquiry::field_error_messages(&err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::Validation(_) => (
            400,
            "VALIDATION_FAILED",
            false,
            Some("Correct the listed fields and resubmit"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce the size or number of attached files"),
            false,
            LogLevel::Debug,
        ),
        AppError::RateLimited { .. } => (
            429,
            "RATE_LIMITED",
            true,
            Some("Wait before submitting again"),
            false,
            LogLevel::Warn,
        ),
        AppError::StorageUnavailable(_) => (
            500,
            "STORAGE_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::StorageQuotaExceeded { .. } => (
            507,
            "STORAGE_QUOTA_EXCEEDED",
            false,
            Some("Submit the enquiry without attachments or with smaller files"),
            false,
            LogLevel::Warn,
        ),
        AppError::UploadFailed(_) => (
            500,
            "UPLOAD_FAILED",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::BadRequest(_) => "BadRequest",
            AppError::Validation(_) => "Validation",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::RateLimited { .. } => "RateLimited",
            AppError::StorageUnavailable(_) => "StorageUnavailable",
            AppError::StorageQuotaExceeded { .. } => "StorageQuotaExceeded",
            AppError::UploadFailed(_) => "UploadFailed",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Field-level messages for validation failures, empty for every other variant
    pub fn field_errors(&self) -> &[String] {
        match self {
            AppError::Validation(fields) => fields,
            _ => &[],
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::Validation(fields) => {
                let lines: Vec<String> = fields.iter().map(|f| format!("- {}", f)).collect();
                format!("Invalid field values:\n{}", lines.join("\n"))
            }
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::RateLimited { retry_after_secs } => {
                format!("Too many requests, retry in {} seconds", retry_after_secs)
            }
            AppError::StorageUnavailable(_) => "Failed to query storage quota".to_string(),
            AppError::StorageQuotaExceeded { .. } => "Storage quota reached".to_string(),
            AppError::UploadFailed(_) => "Failed to upload".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
