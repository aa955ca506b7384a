//! DuckDB-backed access window store.
//!
//! Windows live in a single `db_access` table. Dates are stored as
//! `YYYY-MM-DD` text so that the table stays readable from any SQL client.

use std::path::Path;
use std::time::Duration;

use dbwarden_types::{AccessDate, AccessWindow, ResourceName, SubjectId, WindowField};
use duckdb::{Connection, params};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::{AccessWindowStore, StoreError, StoreResult};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS db_access (
    user_id VARCHAR NOT NULL,
    tbl_name VARCHAR NOT NULL,
    db_access_date VARCHAR,
    db_deny_date VARCHAR,
    PRIMARY KEY (user_id, tbl_name)
)";

const SELECT_WINDOW: &str = "SELECT db_access_date, db_deny_date FROM db_access \
     WHERE user_id = ? AND tbl_name = ?";

const UPSERT_ACCESS: &str = "INSERT INTO db_access (user_id, tbl_name, db_access_date) \
     VALUES (?, ?, ?) \
     ON CONFLICT (user_id, tbl_name) DO UPDATE SET db_access_date = excluded.db_access_date";

const UPSERT_DENY: &str = "INSERT INTO db_access (user_id, tbl_name, db_deny_date) \
     VALUES (?, ?, ?) \
     ON CONFLICT (user_id, tbl_name) DO UPDATE SET db_deny_date = excluded.db_deny_date";

const UPSERT_WINDOW: &str =
    "INSERT INTO db_access (user_id, tbl_name, db_access_date, db_deny_date) \
     VALUES (?, ?, ?, ?) \
     ON CONFLICT (user_id, tbl_name) DO UPDATE SET \
     db_access_date = excluded.db_access_date, db_deny_date = excluded.db_deny_date";

/// Access windows in an embedded DuckDB database.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
}

impl DuckDbStore {
    /// Opens (or creates) a database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Backend(format!("failed to open {}: {e}", path.display())))?;
        debug!(path = %path.display(), "opened duckdb store");
        Self::from_connection(conn)
    }

    /// Creates a transient in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Backend(format!("failed to open in-memory database: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute(CREATE_TABLE, [])
            .map_err(|e| StoreError::Backend(format!("failed to create db_access: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self, timeout: Duration) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .try_lock_for(timeout)
            .ok_or(StoreError::Timeout(timeout))
    }

    fn upsert(
        &self,
        sql: &str,
        subject: &SubjectId,
        resource: &ResourceName,
        field: WindowField,
        date: AccessDate,
        timeout: Duration,
    ) -> StoreResult<u64> {
        let conn = self.lock(timeout)?;
        let rows = conn.execute(
            sql,
            params![subject.as_str(), resource.as_str(), date.to_string()],
        )?;
        trace!(%subject, %resource, %field, %date, rows, "duckdb write");
        Ok(rows as u64)
    }
}

fn parse_date(raw: Option<String>) -> StoreResult<Option<AccessDate>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<AccessDate>())
        .transpose()
        .map_err(StoreError::from)
}

impl AccessWindowStore for DuckDbStore {
    fn read(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        timeout: Duration,
    ) -> StoreResult<AccessWindow> {
        let conn = self.lock(timeout)?;
        let mut stmt = conn.prepare(SELECT_WINDOW)?;
        let mut rows = stmt.query(params![subject.as_str(), resource.as_str()])?;

        let Some(row) = rows.next()? else {
            return Err(StoreError::NotFound {
                subject: subject.clone(),
                resource: resource.clone(),
            });
        };
        let access: Option<String> = row.get(0)?;
        let deny: Option<String> = row.get(1)?;

        Ok(AccessWindow {
            subject: subject.clone(),
            resource: resource.clone(),
            access_until: parse_date(access)?,
            deny_until: parse_date(deny)?,
        })
    }

    fn write_access_until(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        date: AccessDate,
        timeout: Duration,
    ) -> StoreResult<u64> {
        self.upsert(
            UPSERT_ACCESS,
            subject,
            resource,
            WindowField::AccessUntil,
            date,
            timeout,
        )
    }

    fn write_deny_until(
        &self,
        subject: &SubjectId,
        resource: &ResourceName,
        date: AccessDate,
        timeout: Duration,
    ) -> StoreResult<u64> {
        self.upsert(
            UPSERT_DENY,
            subject,
            resource,
            WindowField::DenyUntil,
            date,
            timeout,
        )
    }

    fn put(&self, window: &AccessWindow, timeout: Duration) -> StoreResult<u64> {
        let conn = self.lock(timeout)?;
        let rows = conn.execute(
            UPSERT_WINDOW,
            params![
                window.subject.as_str(),
                window.resource.as_str(),
                window.access_until.map(|d| d.to_string()),
                window.deny_until.map(|d| d.to_string()),
            ],
        )?;
        Ok(rows as u64)
    }

    fn name(&self) -> &'static str {
        "duckdb"
    }
}
