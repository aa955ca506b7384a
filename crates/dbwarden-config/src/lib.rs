//! Configuration management for dbwarden
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence)
//! 2. Environment variables (DBW_* prefix, `__` between section and field)
//! 3. dbwarden.local.toml (gitignored, local overrides)
//! 4. dbwarden.toml (git-tracked, project config)
//! 5. ~/.config/dbwarden/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;
mod loader;
pub mod paths;

pub use error::ConfigError;
pub use loader::{ConfigLoader, ENV_PREFIX};

/// Main dbwarden configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DbwardenConfig {
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub server: ServerSettings,
}

/// Claim verification settings
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC secret used to verify claim signatures.
    pub secret: String,
    /// Clock skew tolerated when checking `exp`.
    pub leeway_secs: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database file for the DuckDB backend.
    pub path: PathBuf,
    /// Upper bound for a single store call.
    pub timeout_ms: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Duckdb,
            path: PathBuf::from("dbwarden.duckdb"),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Duckdb,
    Memory,
}

impl StoreBackend {
    /// Whether windows survive a restart.
    pub fn is_persistent(self) -> bool {
        self == StoreBackend::Duckdb
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StoreBackend::Duckdb => "duckdb",
            StoreBackend::Memory => "memory",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub max_connections: usize,
    pub max_request_bytes: usize,
    pub idle_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            max_connections: 256,
            max_request_bytes: 64 * 1024,
            idle_timeout_secs: 30,
        }
    }
}

impl DbwardenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.store.path.is_relative() {
            self.store.path = base.join(&self.store.path);
        }
    }

    /// Checks the settings a running service cannot do without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.secret must not be empty".to_string(),
            ));
        }
        if self.store.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "store.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_connections must be greater than zero".to_string(),
            ));
        }
        if self.server.max_request_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_request_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Renders the configuration as a `dbwarden.toml` document.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn valid() -> DbwardenConfig {
        let mut config = DbwardenConfig::default();
        config.auth.secret = "s3cret".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = DbwardenConfig::default();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.store.backend, StoreBackend::Duckdb);
        assert_eq!(config.store.timeout(), Duration::from_secs(5));
        assert_eq!(config.auth.leeway_secs, 0);
    }

    #[test]
    fn test_default_config_needs_secret() {
        let err = DbwardenConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("auth.secret"));
        assert!(valid().validate().is_ok());
    }

    #[test_case(|c: &mut DbwardenConfig| c.auth.secret = "   ".into(), "auth.secret"; "blank secret")]
    #[test_case(|c: &mut DbwardenConfig| c.store.timeout_ms = 0, "store.timeout_ms"; "zero timeout")]
    #[test_case(|c: &mut DbwardenConfig| c.server.max_connections = 0, "server.max_connections"; "zero connections")]
    #[test_case(|c: &mut DbwardenConfig| c.server.max_request_bytes = 0, "server.max_request_bytes"; "zero request size")]
    fn test_validation_rejects(mutate: fn(&mut DbwardenConfig), field: &str) {
        let mut config = valid();
        mutate(&mut config);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(field));
    }

    #[test]
    fn test_path_resolution() {
        let mut config = DbwardenConfig::default();
        config.resolve_paths("/srv/dbwarden");
        assert_eq!(config.store.path, PathBuf::from("/srv/dbwarden/dbwarden.duckdb"));

        config.store.path = PathBuf::from("/var/lib/dbwarden.duckdb");
        config.resolve_paths("/srv/dbwarden");
        assert_eq!(config.store.path, PathBuf::from("/var/lib/dbwarden.duckdb"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = valid();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[auth]"));
        assert!(rendered.contains("backend = \"duckdb\""));

        let parsed: DbwardenConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.auth.secret, "s3cret");
        assert_eq!(parsed.server.max_connections, config.server.max_connections);
    }

    #[test_case(StoreBackend::Duckdb, "duckdb", true; "duckdb")]
    #[test_case(StoreBackend::Memory, "memory", false; "memory")]
    fn test_backend_display_matches_toml(backend: StoreBackend, name: &str, persistent: bool) {
        assert_eq!(backend.to_string(), name);
        assert_eq!(backend.is_persistent(), persistent);

        let mut config = valid();
        config.store.backend = backend;
        assert!(config.to_toml().unwrap().contains(&format!("backend = \"{name}\"")));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("s3cret"));
    }
}
