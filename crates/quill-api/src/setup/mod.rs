//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use quill_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Initialize telemetry first
    crate::telemetry::init_telemetry(config.environment.as_str())
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = config.environment.as_str(),
        root_url = %config.root_url,
        media_url = %config.media_url,
        "Configuration loaded and validated successfully"
    );

    // Stores and collaborators, built once
    let collaborators = services::initialize_services(&config).await?;
    let state = services::build_state(&config, collaborators);

    // Setup routes
    let router = routes::setup_routes(&config, state.clone()).await?;

    Ok((state, router))
}
