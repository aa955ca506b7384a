//! Layered config loading: defaults, then files, then environment.

use crate::{DbwardenConfig, paths};
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat, Map};
use std::env;
use std::path::{Path, PathBuf};

/// Prefix of environment overrides, e.g. `DBW_STORE__BACKEND=memory`.
pub const ENV_PREFIX: &str = "DBW";

pub struct ConfigLoader {
    project_dir: PathBuf,
    user_config: Option<PathBuf>,
    env_vars: Option<Map<String, String>>,
}

impl ConfigLoader {
    /// Loads relative to the current directory, including the user config file.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            user_config: paths::user_config_file(),
            env_vars: None,
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Read overrides from `vars` instead of the process environment.
    pub fn with_env_vars(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env_vars = Some(vars.into_iter().collect());
        self
    }

    pub fn without_user_config(mut self) -> Self {
        self.user_config = None;
        self
    }

    /// Later sources win: user file, project file, local file, environment.
    pub fn load(self) -> Result<DbwardenConfig> {
        let files = [
            self.user_config.clone(),
            Some(paths::project_config_file(&self.project_dir)),
            Some(paths::local_config_file(&self.project_dir)),
        ];

        let defaults = Config::try_from(&DbwardenConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);
        for file in files.into_iter().flatten().filter(|f| f.is_file()) {
            builder = builder.add_source(File::from(file).format(FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_vars),
        );

        let mut config: DbwardenConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.resolve_paths(&self.project_dir);
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreBackend;
    use std::fs;
    use tempfile::tempdir;

    fn loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(dir)
            .without_user_config()
            .with_env_vars(Vec::new())
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.store.backend, StoreBackend::Duckdb);
        assert_eq!(config.store.timeout_ms, 5000);
        assert!(config.auth.secret.is_empty());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[auth]
secret = "s3cret"
leeway_secs = 30

[store]
backend = "memory"
timeout_ms = 250

[server]
bind_address = "0.0.0.0:3000"
max_connections = 16
"#;
        fs::write(project_dir.join("dbwarden.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.auth.secret, "s3cret");
        assert_eq!(config.auth.leeway_secs, 30);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.timeout_ms, 250);
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.server.max_connections, 16);
        // Untouched fields keep their defaults
        assert_eq!(config.server.idle_timeout_secs, 30);
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("dbwarden.toml"),
            "[server]\nbind_address = \"127.0.0.1:8080\"\n",
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("dbwarden.local.toml"),
            "[server]\nbind_address = \"127.0.0.1:9999\"\n",
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local config should override project config
        assert_eq!(config.server.bind_address, "127.0.0.1:9999");
    }

    #[test]
    fn test_env_overrides_files() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(project_dir.join("dbwarden.toml"), "[auth]\nsecret = \"file\"\n")
            .expect("Failed to write project config");

        let config = loader(project_dir)
            .with_env_vars([
                ("DBW_AUTH__SECRET".to_string(), "from-env".to_string()),
                ("DBW_SERVER__MAX_REQUEST_BYTES".to_string(), "2048".to_string()),
            ])
            .load()
            .expect("Failed to load config");

        assert_eq!(config.auth.secret, "from-env");
        assert_eq!(config.server.max_request_bytes, 2048);
    }

    #[test]
    fn test_store_path_resolved_against_project_dir() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert!(config.store.path.is_absolute());
        assert!(config.store.path.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_unknown_backend_fails() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        fs::write(
            temp_dir.path().join("dbwarden.toml"),
            "[store]\nbackend = \"postgres\"\n",
        )
        .expect("Failed to write config");

        assert!(loader(temp_dir.path()).load().is_err());
    }
}
