//! Lead attachment upload pipeline

pub mod enquiry;
pub mod orchestrator;
pub mod quota;
pub mod service;
pub mod types;
pub mod worker;

pub use enquiry::merge;
pub use orchestrator::UploadOrchestrator;
pub use quota::QuotaTracker;
pub use service::{AttachmentService, ProcessedEnquiry};
pub use types::{
    FailureReason, FileContent, FileSubmission, UploadBatchError, UploadLink, UploadOutcome,
};
pub use worker::UploadWorker;
