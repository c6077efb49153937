//! Shared constants.

/// Multipart field carrying attachments. May repeat.
pub const FILES_FIELD: &str = "files";

/// Separator line placed between the enquiry text and the attachment list.
pub const ATTACHED_FILES_HEADER: &str = "Attached files:";

/// Remote object property keys attached to every uploaded file.
pub const PROPERTY_LEAD: &str = "lead";
pub const PROPERTY_EMAIL: &str = "email";
pub const PROPERTY_FIRST_NAME: &str = "firstName";
pub const PROPERTY_LAST_NAME: &str = "lastName";
pub const PROPERTY_MOBILE: &str = "mobile";

pub const BYTES_PER_MB: u64 = 1024 * 1024;
