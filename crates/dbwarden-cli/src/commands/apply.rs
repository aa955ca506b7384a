//! Apply command - runs one signed claim through the pipeline without a server.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use dbwarden_server::{ClaimOutcome, ClaimStatus};
use tracing::warn;

use crate::style::{
    colors::SemanticStyle, print_applied_rules, print_error, print_success, print_warn,
};

/// `token` of `-` reads the token from stdin.
pub fn run(project_dir: &Path, token: &str, json: bool) -> Result<()> {
    let token = if token == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read token from stdin")?;
        buf
    } else {
        token.to_string()
    };

    let config = super::load_config(project_dir)?;
    if !config.store.backend.is_persistent() {
        warn!(backend = %config.store.backend, "applied windows are discarded on exit");
        if !json {
            print_warn(&format!(
                "The {} backend keeps nothing between runs; this claim is checked but not stored",
                config.store.backend
            ));
        }
    }
    let handler = super::build_handler(&config)?;
    let outcome = handler.handle_claim(token.trim(), Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        render(&outcome);
    }

    if outcome.status == ClaimStatus::Rejected {
        bail!("Claim rejected");
    }
    Ok(())
}

fn render(outcome: &ClaimOutcome) {
    if let Some(rejection) = &outcome.rejection {
        print_error(&format!("Claim not verified ({}): {}", rejection.kind, rejection.message));
        return;
    }

    let subject = outcome
        .subject
        .as_ref()
        .map_or_else(String::new, ToString::to_string);
    match outcome.status {
        ClaimStatus::FullyApplied => {
            print_success(&format!("Claim for {} fully applied", subject.code()));
        }
        ClaimStatus::PartiallyApplied => {
            print_warn(&format!("Claim for {} partially applied", subject.code()));
        }
        ClaimStatus::Rejected => {
            print_error(&format!("Nothing applied for {}", subject.code()));
        }
    }

    println!();
    print_applied_rules(&outcome.applied);

    for failed in &outcome.failed {
        print_error(&failed.error.to_string());
    }
    for error in &outcome.parse_errors {
        print_warn(&error.to_string());
    }
    for warning in &outcome.warnings {
        print_warn(&warning.to_string());
    }
}
