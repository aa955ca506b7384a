//! dbwarden CLI.
//!
//! Turns signed claims into per-resource access windows.
//!
//! # Quick Start
//!
//! ```bash
//! # Create dbwarden.toml, a signing secret and the access window database
//! dbwarden init ./warden
//!
//! # Serve POST /jwt
//! dbwarden -C ./warden start --address 8080
//!
//! # Or apply a single claim and inspect the result
//! dbwarden -C ./warden apply --token "$JWT"
//! dbwarden -C ./warden show alice accounts
//! ```

mod commands;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use dbwarden_config::StoreBackend;

/// dbwarden - attribute-based access windows from signed claims.
#[derive(Parser)]
#[command(name = "dbwarden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory containing dbwarden.toml.
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Initialize a new project directory.
    Init {
        /// Directory to create the project in.
        path: String,

        /// Where access windows are stored.
        #[arg(long, value_enum, default_value = "duckdb")]
        backend: Backend,
    },

    /// Start the claim server.
    Start {
        /// Address to bind to (port only: 8080, or full: 127.0.0.1:8080).
        /// Defaults to server.bind_address from the configuration.
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Verify a signed claim and apply its rules.
    Apply {
        /// The JWT, or '-' to read it from stdin.
        #[arg(short, long)]
        token: String,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the stored window of a subject on a resource.
    Show {
        /// Subject identifier.
        subject: String,

        /// Resource name.
        resource: String,

        /// Print the window and decision as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Duckdb,
    Memory,
}

impl From<Backend> for StoreBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Duckdb => StoreBackend::Duckdb,
            Backend::Memory => StoreBackend::Memory,
        }
    }
}

fn main() -> ExitCode {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    style::set_no_color(cli.no_color || std::env::var_os("NO_COLOR").is_some());

    let result: Result<()> = match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Init { path, backend } => commands::init::run(&path, backend.into()),
        Commands::Start { address } => commands::start::run(&cli.project_dir, address.as_deref()),
        Commands::Apply { token, json } => commands::apply::run(&cli.project_dir, &token, json),
        Commands::Show {
            subject,
            resource,
            json,
        } => commands::show::run(&cli.project_dir, &subject, &resource, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            style::print_error(&format!("{error:#}"));
            ExitCode::FAILURE
        }
    }
}
