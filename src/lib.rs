//! Inkboard Server - account and comment server for the Inkboard blog.
//!
//! Business logic lives in `inkboard-service`; the REST transport lives in
//! `inkboard-http`. This crate wires them together from CLI/env config and
//! loads optional seed data.

pub mod config;

use std::path::Path;

use inkboard_service::ServiceState;
use inkboard_service::error::ServiceError;
use inkboard_service::seed::{self, Seed, SeedSummary};

pub use inkboard_http::{AppState, router, serve};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid seed file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to apply seed: {0}")]
    Apply(#[from] ServiceError),
}

/// Reads a JSON seed file and inserts its records.
pub async fn load_seed_file(state: &ServiceState, path: &Path) -> Result<SeedSummary, SeedError> {
    let display = path.display().to_string();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: display.clone(),
            source,
        })?;
    let seed: Seed = serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: display,
        source,
    })?;
    Ok(seed::apply(state, seed).await?)
}

/// Builds the HTTP application state from configuration.
pub fn app_state(config: &config::Config) -> AppState {
    AppState::new(
        ServiceState::new(&config.service_config()),
        config.cors_origins.clone(),
        config.secure_cookies,
    )
}
