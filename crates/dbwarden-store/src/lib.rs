//! # dbwarden-store: Access window storage
//!
//! Persists one [`AccessWindow`] per (subject, resource) pair. The updater
//! only sees the [`AccessWindowStore`] trait; backends are injected.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: a locked `HashMap`, used in tests and for throwaway
//!   servers.
//! - [`DuckDbStore`]: an embedded DuckDB database holding the `db_access`
//!   table (feature `duckdb`, on by default).
//!
//! ## Guarantees
//!
//! - At most one row per (subject, resource).
//! - Each write is a single atomic statement that touches one column.
//! - Every call takes a timeout; a store that cannot obtain its lock in
//!   time fails with [`StoreError::Timeout`] instead of blocking.

use std::time::Duration;

use dbwarden_types::{AccessDate, AccessWindow, ResourceName, SubjectId, WindowField};

mod error;
pub mod memory;

#[cfg(feature = "duckdb")]
pub mod duckdb;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDbStore;

/// Default bound on a single store call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Persistent table of access windows keyed by (subject, resource).
pub trait AccessWindowStore: Send + Sync {
    /// Reads the window for a pair.
    ///
    /// Returns [`StoreError::NotFound`] when no row exists.
    fn read(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        timeout: Duration,
    ) -> StoreResult<AccessWindow>;

    /// Sets `access_until`, leaving `deny_until` untouched.
    ///
    /// Returns the number of rows affected.
    fn write_access_until(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        date: AccessDate,
        timeout: Duration,
    ) -> StoreResult<u64>;

    /// Sets `deny_until`, leaving `access_until` untouched.
    ///
    /// Returns the number of rows affected.
    fn write_deny_until(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        date: AccessDate,
        timeout: Duration,
    ) -> StoreResult<u64>;

    /// Stores a complete window, replacing both dates.
    fn put(&self, window: &AccessWindow, timeout: Duration) -> StoreResult<u64>;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Writes whichever field `field` names.
    fn write_field(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        field: WindowField,
        date: AccessDate,
        timeout: Duration,
    ) -> StoreResult<u64> {
        match field {
            WindowField::AccessUntil => self.write_access_until(subject, resource, date, timeout),
            WindowField::DenyUntil => self.write_deny_until(subject, resource, date, timeout),
        }
    }

    /// Like [`read`](Self::read), but maps `NotFound` to `None`.
    fn find(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        timeout: Duration,
    ) -> StoreResult<Option<AccessWindow>> {
        match self.read(subject, resource, timeout) {
            Ok(window) => Ok(Some(window)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
