//! Per-rule failures raised while applying a claim.

use dbwarden_types::{ResourceName, WindowField};
use serde::Serialize;
use thiserror::Error;

/// Why a single rule could not be applied.
///
/// Failures never abort the remaining rules of the same claim.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplyError {
    /// The store refused the read or the write, or wrote no row.
    #[error("failed to persist {field} for '{resource}': {reason}")]
    PersistenceFailure {
        resource: ResourceName,
        field: WindowField,
        reason: String,
    },
}

impl ApplyError {
    pub fn persistence(
        resource: &ResourceName,
        field: WindowField,
        reason: impl ToString,
    ) -> Self {
        Self::PersistenceFailure {
            resource: resource.clone(),
            field,
            reason: reason.to_string(),
        }
    }
}
