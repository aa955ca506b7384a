//! # dbwarden
//!
//! Time-bounded, attribute-based access windows for database tables.
//!
//! A signed claim carries a subject and an attribute string such as
//! `accounts:allow:30days,logs:deny:once`. dbwarden parses that string into
//! rules and records, per (subject, resource), the last day on which access
//! is granted and the last day on which it is denied.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           dbwarden                            │
//! │  ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐ │
//! │  │  Claim   │ → │  Parser  │ → │  Updater  │ → │   Store   │ │
//! │  │ (HS256)  │   │ (rules)  │   │ (windows) │   │ (DuckDB)  │ │
//! │  └──────────┘   └──────────┘   └───────────┘   └───────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Claim verification lives in `dbwarden-server`; this crate starts from an
//! already verified subject.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use dbwarden::{AccessWindowUpdater, MemoryStore, SubjectId, parse};
//!
//! let updater = AccessWindowUpdater::new(Arc::new(MemoryStore::new()));
//! let parsed = parse("accounts:allow:30days,logs:deny:once");
//! let report = updater.apply(&SubjectId::new("u1"), &parsed.rules, Utc::now());
//! assert!(report.is_complete());
//! assert_eq!(report.applied.len(), 2);
//! ```

mod error;
mod updater;

pub use error::ApplyError;
pub use updater::{AccessWindowUpdater, AppliedRule, ApplyReport, FailedRule};

// Re-export shared identifiers and dates
pub use dbwarden_types::{AccessDate, AccessWindow, ResourceName, SubjectId, WindowField};

// Re-export the rule model, parser and evaluator
pub use dbwarden_abac::{
    Decision, DurationSpec, Effect, ParseError, ParseWarning, ParsedAttributes, Rule, evaluate,
    evaluate_at, parse,
};

// Re-export store types for wiring a backend
pub use dbwarden_store::{AccessWindowStore, DEFAULT_TIMEOUT, MemoryStore, StoreError, StoreResult};

#[cfg(feature = "duckdb")]
pub use dbwarden_store::DuckDbStore;
