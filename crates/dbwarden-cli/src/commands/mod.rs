//! CLI command implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use dbwarden::{AccessWindowStore, AccessWindowUpdater, DuckDbStore, MemoryStore};
use dbwarden_config::{DbwardenConfig, StoreBackend, StoreConfig, paths};
use dbwarden_server::{ClaimVerifier, RequestHandler};
use tracing::debug;

pub mod apply;
pub mod init;
pub mod show;
pub mod start;
pub mod version;

/// Loads and validates the configuration for `project_dir`.
pub fn load_config(project_dir: &Path) -> Result<DbwardenConfig> {
    if !paths::is_initialized(project_dir) {
        bail!(
            "No dbwarden.toml in {}. Run 'dbwarden init {}' first.",
            project_dir.display(),
            project_dir.display()
        );
    }

    let config = DbwardenConfig::load_from_dir(project_dir)?;
    config.validate().context("Invalid configuration")?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// Opens the configured backend.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn AccessWindowStore>> {
    let store: Arc<dyn AccessWindowStore> = match config.backend {
        StoreBackend::Duckdb => Arc::new(DuckDbStore::open(&config.path).with_context(|| {
            format!("Failed to open DuckDB store at {}", config.path.display())
        })?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

/// Wires verifier, store and updater from the configuration.
pub fn build_handler(config: &DbwardenConfig) -> Result<RequestHandler> {
    let store = open_store(&config.store)?;
    let verifier = ClaimVerifier::new(&config.auth.secret).with_leeway(config.auth.leeway_secs);
    let updater = AccessWindowUpdater::new(store).with_timeout(config.store.timeout());
    Ok(RequestHandler::new(verifier, updater))
}
