//! Leadrelay Storage Library
//!
//! Storage abstraction for lead attachments and its backends:
//!
//! - [`DriveStorage`]: Google Drive v3 REST API
//! - [`LocalStorage`]: local filesystem with a configured quota
//! - [`InMemoryStorage`]: in-process store with fault injection, for development and tests
//!
//! Every backend exposes the same three remote operations consumed by the upload
//! pipeline: a quota read, a tagged file create, and a delete by id.

pub mod drive;
pub mod factory;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use drive::DriveStorage;
pub use factory::create_storage;
pub use leadrelay_core::StorageBackend;
pub use local::LocalStorage;
pub use memory::InMemoryStorage;
pub use traits::{ByteReader, Storage, StorageError, StorageResult};
