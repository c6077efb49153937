use axum_test::multipart::{MultipartForm, Part};

/// A form with every required field filled in.
pub fn lead_form() -> MultipartForm {
    MultipartForm::new()
        .add_text("email", "jane@example.com")
        .add_text("mobile", "+61412345678")
        .add_text("firstName", "Jane")
        .add_text("lastName", "Doe")
        .add_text("enquiry", "I'd like a quote for a bronze bust.")
}

pub fn file_part(name: &str, data: &[u8]) -> Part {
    Part::bytes(data.to_vec())
        .file_name(name)
        .mime_type("application/octet-stream")
}
