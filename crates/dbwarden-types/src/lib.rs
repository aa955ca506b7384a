//! # dbwarden-types: Core types for `dbwarden`
//!
//! This crate contains shared types used across the `dbwarden` system:
//! - Entity identifiers ([`SubjectId`], [`ResourceName`])
//! - Calendar dates at the store boundary ([`AccessDate`])
//! - The two mutable columns of an access window ([`WindowField`])
//! - The persisted window itself ([`AccessWindow`])

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Entity IDs
// ============================================================================

/// Identifier of a user or device that access rules are attached to.
///
/// Subject ids are issued outside dbwarden and treated as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of a protected resource, usually a database table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ResourceName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Access Date
// ============================================================================

/// Wire format of every date that crosses the store boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error returned when a string is not a `YYYY-MM-DD` date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date '{input}': expected YYYY-MM-DD")]
pub struct DateParseError {
    pub input: String,
}

/// A calendar day on which an access or deny window ends (inclusive).
///
/// Dates have day granularity: a window ending on `2025-01-08` is active for
/// the whole of that day (UTC) and expires at the following midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessDate(NaiveDate);

impl AccessDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Creates a date from its components, or `None` if it does not exist.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// The UTC calendar day containing `now`.
    pub fn today(now: DateTime<Utc>) -> Self {
        Self(now.date_naive())
    }

    /// Sentinel used for windows that never expire.
    ///
    /// `9999-12-31` is the largest date that still renders as `YYYY-MM-DD`,
    /// so it round-trips through every store backend.
    pub fn far_future() -> Self {
        Self(NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX))
    }

    /// Returns `self + days`, saturating at [`AccessDate::far_future`].
    pub fn saturating_add_days(self, days: u64) -> Self {
        let ceiling = Self::far_future();
        match self.0.checked_add_days(Days::new(days)) {
            Some(date) if date <= ceiling.0 => Self(date),
            _ => ceiling,
        }
    }

    pub fn as_naive(self) -> NaiveDate {
        self.0
    }

    pub fn is_far_future(self) -> bool {
        self == Self::far_future()
    }
}

impl Display for AccessDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for AccessDate {
    type Err = DateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Self)
            .map_err(|_| DateParseError {
                input: s.to_string(),
            })
    }
}

impl TryFrom<String> for AccessDate {
    type Error = DateParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccessDate> for String {
    fn from(date: AccessDate) -> Self {
        date.to_string()
    }
}

impl From<NaiveDate> for AccessDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

// ============================================================================
// Window Field
// ============================================================================

/// One of the two expiry columns of an access window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowField {
    /// Date until which access is granted.
    AccessUntil,
    /// Date until which access is denied.
    DenyUntil,
}

impl WindowField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessUntil => "access_until",
            Self::DenyUntil => "deny_until",
        }
    }
}

impl Display for WindowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Access Window
// ============================================================================

/// The persisted access state of one subject on one resource.
///
/// Either date may be unset: a row created by a deny rule has no
/// `access_until` until an allow rule for the same resource arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessWindow {
    pub subject: SubjectId,
    pub resource: ResourceName,
    pub access_until: Option<AccessDate>,
    pub deny_until: Option<AccessDate>,
}

impl AccessWindow {
    /// A window with neither date set.
    pub fn unset(subject: SubjectId, resource: ResourceName) -> Self {
        Self {
            subject,
            resource,
            access_until: None,
            deny_until: None,
        }
    }

    /// Returns the value of one of the two expiry fields.
    pub fn get(&self, field: WindowField) -> Option<AccessDate> {
        match field {
            WindowField::AccessUntil => self.access_until,
            WindowField::DenyUntil => self.deny_until,
        }
    }

    /// Sets one expiry field, leaving the other untouched.
    pub fn set(&mut self, field: WindowField, date: AccessDate) {
        match field {
            WindowField::AccessUntil => self.access_until = Some(date),
            WindowField::DenyUntil => self.deny_until = Some(date),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.access_until.is_none() && self.deny_until.is_none()
    }
}

// ============================================================================
// Tests
// ============================================================================
