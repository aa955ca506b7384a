//! Initialize command - creates a new dbwarden project.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use dbwarden::DuckDbStore;
use dbwarden_config::{DbwardenConfig, StoreBackend, paths};
use rand::RngCore;

use crate::style::{colors::SemanticStyle, print_hint, print_labeled, print_success};

const GITIGNORE: &str = "# Local config overrides (not tracked in git)
dbwarden.local.toml

# Access window database
*.duckdb
*.duckdb.wal
";

pub fn run(path: &str, backend: StoreBackend) -> Result<()> {
    let project_dir = Path::new(path);

    if paths::is_initialized(project_dir) {
        anyhow::bail!(
            "Project already initialized in {}. dbwarden.toml already exists.",
            project_dir.display()
        );
    }

    fs::create_dir_all(project_dir).context("Failed to create project directory")?;

    let mut config = DbwardenConfig::default();
    config.auth.secret = generate_secret();
    config.store.backend = backend;

    let config_path = paths::project_config_file(project_dir);
    fs::write(&config_path, config.to_toml()?).context("Failed to write dbwarden.toml")?;
    print_success("Wrote dbwarden.toml");

    if backend == StoreBackend::Duckdb {
        let db_path = project_dir.join(&config.store.path);
        DuckDbStore::open(&db_path).context("Failed to create access window database")?;
        print_success(&format!("Created {}", config.store.path.display()));
    }

    let gitignore_path = project_dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(&gitignore_path, GITIGNORE).context("Failed to write .gitignore")?;
        print_success("Created .gitignore");
    }

    println!();
    let location = project_dir
        .canonicalize()
        .unwrap_or_else(|_| project_dir.to_path_buf());
    print_labeled("Location", &location.display().to_string());
    print_labeled("Backend", &format!("{backend:?}").to_lowercase());
    println!();
    println!("{}", "Next steps:".header());
    print_hint("The signing secret is in dbwarden.toml under [auth].");
    println!("  {}", format!("dbwarden -C {path} start").code());

    Ok(())
}

/// 32 random bytes, hex encoded.
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
