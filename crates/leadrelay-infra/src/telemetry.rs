//! Tracing initialization
//!
//! `RUST_LOG` takes precedence; otherwise the configured level applies to the service
//! crates and `tower_http`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(log_level: &str) -> String {
    format!(
        "leadrelay_api={lvl},leadrelay_storage={lvl},leadrelay_infra={lvl},tower_http={lvl}",
        lvl = log_level
    )
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_telemetry(
    service_name: &str,
    log_level: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(log_level)))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::info!(service = %service_name, log_level = %log_level, json, "Tracing initialized");
    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("Telemetry shutdown");
}
