use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::upload::MetadataTags;

/// E.164 phone number: optional leading digit group after `+`, 7-14 further digits.
static MOBILE_E164: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+[1-9]?[0-9]{7,14}$").expect("E.164 pattern is a valid regex")
});

/// A lead-capture submission, as read from the form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Enquiry {
    /// Correlation id generated per submission
    #[serde(skip_deserializing, default = "Uuid::new_v4")]
    pub lead_id: Uuid,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(regex(path = *MOBILE_E164, message = "must be an E.164 phone number"))]
    pub mobile: String,
    #[validate(length(min = 1, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub enquiry: String,
}

impl Enquiry {
    pub fn new(
        email: impl Into<String>,
        mobile: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        enquiry: impl Into<String>,
    ) -> Self {
        Self {
            lead_id: Uuid::new_v4(),
            email: email.into(),
            mobile: mobile.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            enquiry: enquiry.into(),
        }
    }

    /// Tags attached to every file uploaded for this lead.
    pub fn metadata_tags(&self) -> MetadataTags {
        MetadataTags {
            lead: self.lead_id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            mobile: self.mobile.clone(),
        }
    }
}

/// Successful submission response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeadResponse {
    pub lead_id: Uuid,
    /// Enquiry text including the attachment list
    pub enquiry: String,
    pub attached_files: usize,
}

/// Form field name for a struct field, so messages match what the client sent.
fn form_field_name(field: &str) -> &str {
    match field {
        "first_name" => "firstName",
        "last_name" => "lastName",
        other => other,
    }
}

/// Flatten validator errors into `field: message` lines, sorted by field.
pub fn field_error_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let mut messages = Vec::new();
    for (field, field_errors) in fields {
        for error in field_errors.iter() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            messages.push(format!("{}: {}", form_field_name(&field), message));
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Enquiry {
        Enquiry::new(
            "jane@example.com",
            "+61412345678",
            "Jane",
            "Doe",
            "I'd like a quote",
        )
    }

    #[test]
    fn test_valid_enquiry_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut enquiry = valid();
        enquiry.email = "not-an-email".to_string();
        let errors = enquiry.validate().unwrap_err();
        assert_eq!(
            field_error_messages(&errors),
            vec!["email: must be a valid email address".to_string()]
        );
    }

    #[test]
    fn test_mobile_must_be_e164() {
        for bad in ["", "0412345678", "+61 412 345 678", "+12"] {
            let mut enquiry = valid();
            enquiry.mobile = bad.to_string();
            assert!(enquiry.validate().is_err(), "{bad:?} should be rejected");
        }
        for good in ["+61412345678", "+14155552671", "+4420794600"] {
            let mut enquiry = valid();
            enquiry.mobile = good.to_string();
            assert!(enquiry.validate().is_ok(), "{good:?} should be accepted");
        }
    }

    #[test]
    fn test_missing_fields_reported_with_form_names_in_order() {
        let enquiry = Enquiry::new("jane@example.com", "+61412345678", "", "", "");
        let errors = enquiry.validate().unwrap_err();
        assert_eq!(
            field_error_messages(&errors),
            vec![
                "enquiry: is required".to_string(),
                "firstName: is required".to_string(),
                "lastName: is required".to_string(),
            ]
        );
    }

    #[test]
    fn test_metadata_tags_carry_lead_id() {
        let enquiry = valid();
        let tags = enquiry.metadata_tags();
        assert_eq!(tags.lead, enquiry.lead_id);
        assert_eq!(tags.email, "jane@example.com");
        assert_eq!(tags.first_name, "Jane");
    }
}
