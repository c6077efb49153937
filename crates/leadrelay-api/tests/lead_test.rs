//! Lead submission integration tests over the full router.
//!
//! Run with: `cargo test -p leadrelay-api --test lead_test`

mod helpers;

use helpers::fixtures::{file_part, lead_form};
use helpers::{setup_test_app, setup_test_app_with, test_config};
use leadrelay_api::ErrorResponse;
use leadrelay_core::models::LeadResponse;
use leadrelay_storage::InMemoryStorage;

#[tokio::test]
async fn test_ping() {
    let app = setup_test_app(InMemoryStorage::unlimited());

    let response = app.client().get("/ping").await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), ".");
}

#[tokio::test]
async fn test_openapi_document_lists_lead_route() {
    let app = setup_test_app(InMemoryStorage::unlimited());

    let response = app.client().get("/api-docs/openapi.json").await;

    assert_eq!(response.status_code(), 200);
    let doc: serde_json::Value = response.json();
    assert_eq!(doc["info"]["title"], "Leadrelay API");
    assert!(doc["paths"]["/lead"]["post"].is_object());
}

#[tokio::test]
async fn test_submit_lead_without_files() {
    let app = setup_test_app(InMemoryStorage::unlimited());

    let response = app.client().post("/lead").multipart(lead_form()).await;

    assert_eq!(response.status_code(), 200);
    let body: LeadResponse = response.json();
    assert_eq!(body.enquiry, "I'd like a quote for a bronze bust.");
    assert_eq!(body.attached_files, 0);
    assert_eq!(app.storage.quota_calls(), 0);
    assert_eq!(app.storage.create_calls(), 0);
}

#[tokio::test]
async fn test_submit_lead_with_files_links_in_order() {
    let app = setup_test_app(InMemoryStorage::new(1024 * 1024));

    let form = lead_form()
        .add_part("files", file_part("front.jpg", b"front view"))
        .add_part("files", file_part("side.jpg", b"side"))
        .add_part("files", file_part("notes.txt", b"measurements"));
    let response = app.client().post("/lead").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: LeadResponse = response.json();
    assert_eq!(body.attached_files, 3);
    assert_eq!(app.storage.file_count(), 3);

    let lines: Vec<&str> = body.enquiry.lines().collect();
    assert_eq!(lines[0], "I'd like a quote for a bronze bust.");
    assert_eq!(lines[1], "Attached files:");
    assert_eq!(lines.len(), 5);

    // Each link resolves to the file submitted at that position.
    let expected = ["front.jpg", "side.jpg", "notes.txt"];
    for (line, name) in lines[2..].iter().zip(expected) {
        let id = line
            .strip_prefix("- memory://leadrelay/")
            .expect("memory link");
        let stored = app.storage.get(id).expect("stored file");
        assert_eq!(stored.name, name);
        assert_eq!(stored.properties["email"], "jane@example.com");
        assert_eq!(stored.properties["lead"], body.lead_id.to_string());
    }
}

#[tokio::test]
async fn test_invalid_fields_rejected_before_upload() {
    let app = setup_test_app(InMemoryStorage::unlimited());

    let form = lead_form()
        .add_text("email", "not-an-email")
        .add_text("mobile", "0412 345 678")
        .add_part("files", file_part("a.txt", b"a"));
    let response = app.client().post("/lead").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_FAILED");
    let fields = body.fields.expect("field errors");
    assert!(fields.iter().any(|f| f.starts_with("email:")));
    assert!(fields.iter().any(|f| f.starts_with("mobile:")));
    assert_eq!(app.storage.create_calls(), 0);
}

#[tokio::test]
async fn test_quota_exceeded_returns_507_and_rolls_back() {
    // 10 bytes left: the first file fits, the second reaches the limit.
    let app = setup_test_app(InMemoryStorage::new(100).with_used(90));

    let form = lead_form()
        .add_part("files", file_part("a.bin", &[0u8; 4]))
        .add_part("files", file_part("b.bin", &[0u8; 6]));
    let response = app.client().post("/lead").multipart(form).await;

    assert_eq!(response.status_code(), 507);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "STORAGE_QUOTA_EXCEEDED");
    app.wait_for_files(0).await;
    assert!(app.notifier.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_backend_failure_returns_500_and_rolls_back() {
    let app = setup_test_app(InMemoryStorage::unlimited().fail_on("broken.bin"));

    let form = lead_form()
        .add_part("files", file_part("ok-1.bin", b"one"))
        .add_part("files", file_part("broken.bin", b"two"))
        .add_part("files", file_part("ok-2.bin", b"three"));
    let response = app.client().post("/lead").multipart(form).await;

    assert_eq!(response.status_code(), 500);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "UPLOAD_FAILED");
    app.wait_for_files(0).await;
}

#[tokio::test]
async fn test_quota_unavailable_returns_storage_unavailable() {
    let app = setup_test_app(InMemoryStorage::unlimited().fail_quota());

    let form = lead_form().add_part("files", file_part("a.txt", b"a"));
    let response = app.client().post("/lead").multipart(form).await;

    assert_eq!(response.status_code(), 500);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "STORAGE_UNAVAILABLE");
    assert_eq!(app.storage.create_calls(), 0);
}

#[tokio::test]
async fn test_oversized_body_returns_413() {
    let config = test_config(&[("MAX_REQUEST_SIZE_MB", "1")]);
    let app = setup_test_app_with(config, InMemoryStorage::unlimited());

    let form = lead_form().add_part("files", file_part("scan.tiff", &vec![0u8; 2 * 1024 * 1024]));
    let response = app.client().post("/lead").multipart(form).await;

    assert_eq!(response.status_code(), 413);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "PAYLOAD_TOO_LARGE");
    assert_eq!(app.storage.quota_calls(), 0);
    assert_eq!(app.storage.create_calls(), 0);
}

#[tokio::test]
async fn test_notification_sent_with_final_enquiry() {
    let app = setup_test_app(InMemoryStorage::unlimited());

    let form = lead_form().add_part("files", file_part("plan.pdf", b"%PDF"));
    let response = app.client().post("/lead").multipart(form).await;
    assert_eq!(response.status_code(), 200);
    let body: LeadResponse = response.json();

    let sent = app.wait_for_notifications(1).await;
    assert_eq!(sent[0].0, "jane@example.com");
    assert_eq!(sent[0].1, body.enquiry);
    assert!(sent[0].1.contains("Attached files:"));
}

#[tokio::test]
async fn test_rate_limit_applies_to_lead_only() {
    let config = test_config(&[
        ("ENVIRONMENT", "production"),
        ("RATE_LIMIT_PER_MINUTE", "1"),
    ]);
    let app = setup_test_app_with(config, InMemoryStorage::unlimited());

    let first = app.client().post("/lead").multipart(lead_form()).await;
    assert_eq!(first.status_code(), 200);
    assert_eq!(first.header("X-RateLimit-Limit"), "1");

    let second = app.client().post("/lead").multipart(lead_form()).await;
    assert_eq!(second.status_code(), 429);
    assert!(second.maybe_header("Retry-After").is_some());

    let ping = app.client().get("/ping").await;
    assert_eq!(ping.status_code(), 200);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let app = setup_test_app(InMemoryStorage::unlimited());

    let response = app
        .client()
        .get("/ping")
        .add_header("X-Request-ID", "lead-test-1")
        .await;

    assert_eq!(response.header("X-Request-ID"), "lead-test-1");
}
