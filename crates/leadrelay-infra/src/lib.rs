//! Leadrelay Infrastructure Library
//!
//! Shared infrastructure used by the API binary:
//! - Middleware (request ID)
//! - Telemetry initialization
//! - Per-IP rate limiting and client IP extraction

pub mod ip;
pub mod middleware;
pub mod rate_limit;
pub mod telemetry;

// Re-export commonly used types
pub use ip::extract_client_ip;
pub use middleware::{get_request_id, request_id_middleware, RequestId};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use telemetry::{init_telemetry, shutdown_telemetry};
