//! OpenAPI documentation, served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use leadrelay_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leadrelay API",
        version = "0.1.0",
        description = "Lead capture API. Accepts a contact form with optional attachments, stores the attachments with the configured backend and links them into the enquiry."
    ),
    paths(
        handlers::lead::submit_lead,
        handlers::health::ping,
    ),
    components(schemas(
        handlers::lead::LeadForm,
        models::LeadResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "leads", description = "Lead submission"),
        (name = "health", description = "Heartbeat")
    )
)]
pub struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
