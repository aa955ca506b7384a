//! Show command - prints a stored window and today's decision.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use dbwarden::{ResourceName, SubjectId, evaluate_at};
use serde_json::json;

use crate::style::{colors, colors::SemanticStyle, print_labeled, window_table};

pub fn run(project_dir: &Path, subject: &str, resource: &str, json: bool) -> Result<()> {
    let config = super::load_config(project_dir)?;
    let store = super::open_store(&config.store)?;

    let subject = SubjectId::new(subject);
    let resource = ResourceName::new(resource);
    let window = store.find(&subject, &resource, config.store.timeout())?;
    let decision = evaluate_at(window.as_ref(), Utc::now());

    if json {
        let body = json!({ "window": window, "decision": decision });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match &window {
        Some(window) => println!("{}", window_table(window)),
        None => println!(
            "{}",
            format!("No access window recorded for {subject} on {resource}.").muted()
        ),
    }
    print_labeled("Decision", &colors::effect(decision.effect));
    if let Some(until) = decision.until {
        print_labeled("Until", &until.to_string());
    }
    print_labeled("Reason", &decision.reason);
    Ok(())
}
