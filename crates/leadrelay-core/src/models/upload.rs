use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    PROPERTY_EMAIL, PROPERTY_FIRST_NAME, PROPERTY_LAST_NAME, PROPERTY_LEAD, PROPERTY_MOBILE,
};

/// Storage usage and limit, read once at the start of a batch.
///
/// `used <= limit` is not enforced here. A backend without a limit reports `u64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub limit: u64,
    pub used: u64,
}

impl QuotaSnapshot {
    pub fn new(limit: u64, used: u64) -> Self {
        Self { limit, used }
    }

    pub fn unlimited(used: u64) -> Self {
        Self {
            limit: u64::MAX,
            used,
        }
    }

    /// Bytes left before the limit is reached.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }
}

/// Properties attached to every remote object of one batch, for tracing a file back to its lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTags {
    pub lead: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
}

impl MetadataTags {
    /// Key/value form sent to the backend.
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (PROPERTY_LEAD.to_string(), self.lead.to_string()),
            (PROPERTY_EMAIL.to_string(), self.email.clone()),
            (PROPERTY_FIRST_NAME.to_string(), self.first_name.clone()),
            (PROPERTY_LAST_NAME.to_string(), self.last_name.clone()),
            (PROPERTY_MOBILE.to_string(), self.mobile.clone()),
        ])
    }
}

/// A file the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub download_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_saturates() {
        assert_eq!(QuotaSnapshot::new(100, 40).remaining(), 60);
        assert_eq!(QuotaSnapshot::new(100, 140).remaining(), 0);
        assert_eq!(QuotaSnapshot::unlimited(5).remaining(), u64::MAX - 5);
    }

    #[test]
    fn test_to_properties_uses_wire_keys() {
        let lead = Uuid::new_v4();
        let tags = MetadataTags {
            lead,
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            mobile: "+61400000000".to_string(),
        };

        let props = tags.to_properties();
        assert_eq!(props.len(), 5);
        assert_eq!(props["lead"], lead.to_string());
        assert_eq!(props["firstName"], "Jane");
        assert_eq!(props["lastName"], "Doe");
        assert_eq!(props["mobile"], "+61400000000");
    }
}
