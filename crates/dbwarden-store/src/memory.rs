//! In-memory access window store.

use std::collections::HashMap;
use std::time::Duration;

use dbwarden_types::{AccessDate, AccessWindow, ResourceName, SubjectId, WindowField};
use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::{AccessWindowStore, StoreError, StoreResult};

type Key = (SubjectId, ResourceName);

/// A `HashMap` of windows behind a timed lock.
///
/// By default writes create a missing row (upsert). A store built with
/// [`MemoryStore::update_only`] instead reports zero affected rows, matching a
/// plain `UPDATE` against a table without the row.
#[derive(Debug, Default)]
pub struct MemoryStore {
    windows: Mutex<HashMap<Key, AccessWindow>>,
    update_only: bool,
}

impl MemoryStore {
    /// Creates an empty store that upserts on write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose writes never create rows.
    pub fn update_only() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            update_only: true,
        }
    }

    /// Seeds the store with existing windows.
    pub fn with_windows(self, windows: impl IntoIterator<Item = AccessWindow>) -> Self {
        {
            let mut map = self.windows.lock();
            for w in windows {
                map.insert((w.subject.clone(), w.resource.clone()), w);
            }
        }
        self
    }

    /// Number of stored windows.
    pub fn len(&self) -> usize {
        self.windows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self, timeout: Duration) -> StoreResult<MutexGuard<'_, HashMap<Key, AccessWindow>>> {
        self.windows
            .try_lock_for(timeout)
            .ok_or(StoreError::Timeout(timeout))
    }

    fn write(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        field: WindowField,
        date: AccessDate,
        timeout: Duration,
    ) -> StoreResult<u64> {
        let mut map = self.lock(timeout)?;
        let key = (subject.clone(), resource.clone());

        if self.update_only && !map.contains_key(&key) {
            return Ok(0);
        }
        map.entry(key)
            .or_insert_with(|| AccessWindow::unset(subject.clone(), resource.clone()))
            .set(field, date);
        trace!(%subject, %resource, %field, %date, "memory store write");
        Ok(1)
    }
}

impl AccessWindowStore for MemoryStore {
    fn read(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        timeout: Duration,
    ) -> StoreResult<AccessWindow> {
        let map = self.lock(timeout)?;
        map.get(&(subject.clone(), resource.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                subject: subject.clone(),
                resource: resource.clone(),
            })
    }

    fn write_access_until(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        date: AccessDate,
        timeout: Duration,
    ) -> StoreResult<u64> {
        self.write(subject, resource, WindowField::AccessUntil, date, timeout)
    }

    fn write_deny_until(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        date: AccessDate,
        timeout: Duration,
    ) -> StoreResult<u64> {
        self.write(subject, resource, WindowField::DenyUntil, date, timeout)
    }

    fn put(&self, window: &AccessWindow, timeout: Duration) -> StoreResult<u64> {
        let mut map = self.lock(timeout)?;
        map.insert(
            (window.subject.clone(), window.resource.clone()),
            window.clone(),
        );
        Ok(1)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
