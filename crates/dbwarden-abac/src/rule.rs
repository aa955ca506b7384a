//! Rule model produced by the attribute parser.
//!
//! A rule says what to do with one resource: extend the access window
//! (`Allow`) or the deny window (`Deny`), and for how long.

use dbwarden_types::{AccessDate, ResourceName, WindowField};
use serde::{Deserialize, Serialize};

// ============================================================================
// Effect
// ============================================================================

/// The effect of a rule: grant or deny access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Grant access.
    Allow,
    /// Deny access.
    Deny,
}

impl Effect {
    /// The window column a rule with this effect writes.
    pub fn target_field(self) -> WindowField {
        match self {
            Self::Allow => WindowField::AccessUntil,
            Self::Deny => WindowField::DenyUntil,
        }
    }
}

// ============================================================================
// Duration
// ============================================================================

/// How long a rule's window lasts, counted from the day it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSpec {
    /// Never expires; stored as [`AccessDate::far_future`].
    Always,
    /// Expires at the end of the day it was applied.
    Once,
    /// Expires `n` days after the day it was applied.
    NDays(u32),
}

impl DurationSpec {
    /// Number of days this duration adds to "today", or `None` for `Always`.
    pub fn days(self) -> Option<u32> {
        match self {
            Self::Always => None,
            Self::Once => Some(0),
            Self::NDays(n) => Some(n),
        }
    }

    /// The expiry date of a window opened on `today`.
    pub fn expiry_from(self, today: AccessDate) -> AccessDate {
        match self.days() {
            None => AccessDate::far_future(),
            Some(days) => today.saturating_add_days(u64::from(days)),
        }
    }
}

// ============================================================================
// Rule
// ============================================================================

/// A single per-resource instruction decoded from an attribute string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The table or object the rule applies to.
    pub resource: ResourceName,
    /// Which window the rule extends.
    pub effect: Effect,
    /// How far the window is extended.
    pub duration: DurationSpec,
}

impl Rule {
    pub fn new(resource: impl Into<ResourceName>, effect: Effect, duration: DurationSpec) -> Self {
        Self {
            resource: resource.into(),
            effect,
            duration,
        }
    }

    /// The window column this rule writes.
    pub fn field(&self) -> WindowField {
        self.effect.target_field()
    }
}

// ============================================================================
// Tests
// ============================================================================
