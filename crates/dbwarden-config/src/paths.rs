//! Where dbwarden looks for its config files.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Git-tracked project config.
pub const PROJECT_FILE: &str = "dbwarden.toml";

/// Untracked per-checkout overrides.
pub const LOCAL_FILE: &str = "dbwarden.local.toml";

/// `config.toml` under the platform config dir, if the platform has one.
pub fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("com", "dbwarden", "dbwarden")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
    project_dir.as_ref().join(PROJECT_FILE)
}

pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
    project_dir.as_ref().join(LOCAL_FILE)
}

/// A directory is initialized once `dbwarden init` has written its project file.
pub fn is_initialized(project_dir: impl AsRef<Path>) -> bool {
    project_config_file(project_dir).is_file()
}
