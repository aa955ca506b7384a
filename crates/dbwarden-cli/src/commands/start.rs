//! Start command - runs the claim server.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use dbwarden_server::{Server, ServerConfig};
use tracing::info;

use crate::style::{print_labeled, print_success};

pub fn run(project_dir: &Path, address: Option<&str>) -> Result<()> {
    let config = super::load_config(project_dir)?;
    let settings = &config.server;

    let bind_addr = parse_address(address.unwrap_or(&settings.bind_address))?;
    let server_config = ServerConfig::new(bind_addr)
        .with_max_connections(settings.max_connections)
        .with_max_request_bytes(settings.max_request_bytes)
        .with_idle_timeout(Duration::from_secs(settings.idle_timeout_secs));

    let handler = super::build_handler(&config)?;
    let mut server = Server::new(server_config, handler).context("Failed to create server")?;
    let shutdown = server.shutdown_handle();
    shutdown
        .register_signals()
        .context("Failed to install signal handlers")?;

    let local = server.local_addr()?;
    info!(%local, backend = %config.store.backend, "starting dbwarden server");
    println!();
    print_labeled("Listening", &local.to_string());
    print_labeled("Backend", &config.store.backend.to_string());
    if config.store.backend.is_persistent() {
        print_labeled("Store", &config.store.path.display().to_string());
    }
    println!();
    println!("Server is ready. Press Ctrl+C to stop.");

    server.run().context("Server error during operation")?;

    println!();
    print_success("Server stopped gracefully.");
    Ok(())
}

/// Parses an address string into a `SocketAddr`.
///
/// Accepts:
/// - Port only: "3000" -> "127.0.0.1:3000"
/// - Full address: "127.0.0.1:3000"
/// - IPv6: `[::1]:3000`
fn parse_address(address: &str) -> Result<SocketAddr> {
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(port) = address.parse::<u16>() {
        return Ok(SocketAddr::from(([127, 0, 0, 1], port)));
    }

    bail!(
        "Invalid address '{address}'. Use a port (e.g., '3000') or full address (e.g., '127.0.0.1:3000')"
    );
}
