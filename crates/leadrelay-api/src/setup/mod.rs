//! Application setup and initialization

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use leadrelay_core::Config;
use leadrelay_storage::create_storage;

use crate::services::email::{EmailService, Notifier};
use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    leadrelay_infra::init_telemetry(config.service_name(), config.log_level(), config.log_json())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        backend = %config.storage_backend(),
        "Configuration loaded and validated successfully"
    );

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;

    let notifier = EmailService::from_config(&config)?
        .map(|service| Arc::new(service) as Arc<dyn Notifier>);

    let state = Arc::new(AppState::new(config.clone(), storage, notifier));
    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router))
}
