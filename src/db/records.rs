//! Record types stored in the scan database
//!
//! These mirror the tables created in [`crate::db::schema`]. Timestamps are
//! Unix seconds; sizes are bytes.
//!
//! Entry names keep their exact bytes. A name that is valid UTF-8 is stored
//! as TEXT, anything else as a BLOB of the raw bytes, so distinct names on
//! disk stay distinct in the database.

use crate::error::{DbError, DbResult};
use rusqlite::types::{Value, ValueRef};
use rusqlite::Row;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};

/// Outcome of visiting one directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ScanStatus {
    /// Materialized as an ancestor but not processed (yet)
    #[default]
    NotScanned = 0,
    /// Stat and listing both succeeded
    Successful = 1,
    /// Stat or listing was denied
    SkippedPermission = 2,
    /// Path matched an exclusion pattern
    SkippedExclude = 3,
}

impl ScanStatus {
    /// Convert from the database representation
    pub fn from_db_int(value: i64) -> DbResult<Self> {
        match value {
            0 => Ok(ScanStatus::NotScanned),
            1 => Ok(ScanStatus::Successful),
            2 => Ok(ScanStatus::SkippedPermission),
            3 => Ok(ScanStatus::SkippedExclude),
            other => Err(DbError::InvalidValue {
                column: "scan_status",
                value: other,
            }),
        }
    }

    /// Get database integer representation
    pub fn as_db_int(&self) -> i64 {
        *self as i64
    }
}

/// SQL value for an entry name
pub fn name_to_sql(name: &OsStr) -> Value {
    match name.to_str() {
        Some(text) => Value::Text(text.to_owned()),
        None => Value::Blob(name.as_bytes().to_vec()),
    }
}

/// Read an entry name stored by [`name_to_sql`]
pub fn name_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<OsString> {
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Ok(OsString::from_vec(bytes.to_vec())),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "name".into(),
            other.data_type(),
        )),
    }
}

/// A file as it is inserted into the `files` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: OsString,
    pub directory_id: i64,
    pub user_id: u32,
    pub group_id: u32,
    /// Blocks x 512
    pub allocated_size: u64,
    /// Logical length
    pub apparent_size: u64,
    pub mtime: i64,
    pub num_links: u64,
}

/// A row of the `users` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub uid: u32,
    pub name: String,
}

/// A row of the `user_groups` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub gid: u32,
    pub name: String,
}

/// A directory annotated with totals over its immediate files.
///
/// Produced by [`crate::db::query::query_totals`]. Counts and sizes are zero
/// for a directory without files; `mtime_dir` is absent only when neither the
/// directory itself nor any of its files carries a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTotals {
    pub id: i64,
    pub name: OsString,
    pub parent_id: Option<i64>,
    pub mtime: Option<i64>,
    pub scan_status: ScanStatus,
    pub file_count_dir: Option<u64>,
    pub allocated_size_dir: Option<u64>,
    pub apparent_size_dir: Option<u64>,
    pub mtime_dir: Option<i64>,
}

impl DirectoryTotals {
    /// A record with zeroed per-directory totals (handy for building trees by hand)
    pub fn empty(id: i64, name: impl Into<OsString>, parent_id: Option<i64>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            mtime: None,
            scan_status: ScanStatus::Successful,
            file_count_dir: Some(0),
            allocated_size_dir: Some(0),
            apparent_size_dir: Some(0),
            mtime_dir: None,
        }
    }
}
