//! Leadrelay Core Library
//!
//! This crate provides core domain models, error types, and configuration
//! shared by the storage backends, infrastructure, and HTTP API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, LeadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{Enquiry, MetadataTags, QuotaSnapshot, StoredFile};
pub use storage_types::StorageBackend;
