pub mod enquiry;
pub mod upload;

pub use enquiry::{Enquiry, LeadResponse};
pub use upload::{MetadataTags, QuotaSnapshot, StoredFile};
