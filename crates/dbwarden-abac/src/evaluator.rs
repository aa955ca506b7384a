//! Access decisions over a stored access window.
//!
//! A deny window that is still open always wins. Otherwise an open access
//! window grants access. Anything else, including a missing row, is denied.

use chrono::{DateTime, Utc};
use dbwarden_types::{AccessDate, AccessWindow};
use serde::Serialize;

use crate::rule::Effect;

// ============================================================================
// Decision
// ============================================================================

/// The result of checking a subject's access to a resource on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Whether access is allowed or denied.
    pub effect: Effect,
    /// Last day on which this decision holds, when it comes from a window.
    pub until: Option<AccessDate>,
    /// Human-readable explanation of why this decision was made.
    pub reason: String,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Evaluates a window (or its absence) on `today`.
///
/// Both window ends are inclusive.
pub fn evaluate(window: Option<&AccessWindow>, today: AccessDate) -> Decision {
    let Some(window) = window else {
        return Decision {
            effect: Effect::Deny,
            until: None,
            reason: "No access window recorded; denying by default".to_string(),
        };
    };

    if let Some(deny_until) = window.deny_until.filter(|d| *d >= today) {
        return Decision {
            effect: Effect::Deny,
            until: Some(deny_until),
            reason: format!("Deny window open until {deny_until}"),
        };
    }

    if let Some(access_until) = window.access_until.filter(|d| *d >= today) {
        return Decision {
            effect: Effect::Allow,
            until: Some(access_until),
            reason: format!("Access window open until {access_until}"),
        };
    }

    let reason = match window.access_until {
        Some(expired) => format!("Access window expired on {expired}"),
        None => "No access window granted; denying by default".to_string(),
    };
    Decision {
        effect: Effect::Deny,
        until: None,
        reason,
    }
}

/// Evaluates a window at the UTC day containing `now`.
pub fn evaluate_at(window: Option<&AccessWindow>, now: DateTime<Utc>) -> Decision {
    evaluate(window, AccessDate::today(now))
}

// ============================================================================
// Tests
// ============================================================================
