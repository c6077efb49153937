//! Router construction

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use leadrelay_core::Config;
use leadrelay_infra::{rate_limit_middleware, request_id_middleware, RateLimiter};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
///
/// Only `POST /lead` is rate limited; the heartbeat and the API document are not.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router<()> {
    let mut lead_routes = Router::new().route("/lead", post(handlers::lead::submit_lead));

    if config.rate_limit_enabled() {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_per_minute(),
            config.trusted_proxy_count(),
        ));
        tracing::info!(
            limit_per_minute = config.rate_limit_per_minute(),
            trusted_proxy_count = config.trusted_proxy_count(),
            "Rate limiting enabled"
        );
        lead_routes = lead_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    // Enforced while the multipart body is read, so an oversized form renders as a JSON 413.
    let body_limit = usize::try_from(config.max_request_size_bytes()).unwrap_or(usize::MAX);

    Router::new()
        .route("/ping", get(handlers::health::ping))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(crate::api_doc::openapi_spec()) }),
        )
        .merge(lead_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
