//! Leadrelay API Library
//!
//! HTTP handlers, the attachment upload services and application setup.

mod api_doc;
mod handlers;

pub mod error;
pub mod services;
pub mod setup;
pub mod state;

// Re-exports
pub use error::ErrorResponse;
pub use services::email::Notifier;
pub use state::AppState;
