//! Database schema definitions and creation
//!
//! This module defines the SQLite schema for storing scan results
//! and provides functions to create and configure the database.

use crate::error::DbResult;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

/// Schema version recorded in the metadata table
pub const SCHEMA_VERSION: &str = "2023.06";

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    uid INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
)
"#;

const CREATE_GROUPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_groups (
    gid INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
)
"#;

/// Directories reference their parent by id; only the scan root has a NULL parent.
/// Entry names are TEXT, or a BLOB of the raw bytes when not valid UTF-8.
const CREATE_DIRECTORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS directories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    parent_id INTEGER REFERENCES directories(id),
    mtime INTEGER,                          -- Unix timestamp, NULL until scanned
    scan_status INTEGER NOT NULL DEFAULT 0  -- 0=not scanned, 1=ok, 2=permission, 3=excluded
)
"#;

const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    directory_id INTEGER NOT NULL REFERENCES directories(id),
    user_id INTEGER NOT NULL REFERENCES users(uid),
    group_id INTEGER NOT NULL REFERENCES user_groups(gid),
    allocated_size INTEGER NOT NULL,        -- st_blocks * 512
    apparent_size INTEGER NOT NULL,         -- st_size
    mtime INTEGER NOT NULL,
    num_links INTEGER NOT NULL,
    UNIQUE (name, directory_id)
)
"#;

const CREATE_METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT                              -- JSON encoded
)
"#;

/// Secondary indexes (created after the scan for better insert performance)
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_directories_parent ON directories(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_files_directory ON files(directory_id)",
    "CREATE INDEX IF NOT EXISTS idx_files_user_directory ON files(user_id, directory_id)",
];

/// SQLite pragmas for write throughput during a scan
const WRITE_PRAGMAS: &str = r#"
PRAGMA foreign_keys = ON;
PRAGMA journal_mode = WAL;
PRAGMA synchronous = OFF;
PRAGMA temp_store = MEMORY;
PRAGMA mmap_size = 1073741824;   -- 1GB mmap
PRAGMA cache_size = -32768;      -- 32MB cache
"#;

/// SQLite pragmas applied once the scan is finished
const READ_PRAGMAS: &str = r#"
PRAGMA synchronous = FULL;
"#;

/// Create and configure a new database for writing
pub fn create_database(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(WRITE_PRAGMAS)?;

    conn.execute(CREATE_USERS_TABLE, [])?;
    conn.execute(CREATE_GROUPS_TABLE, [])?;
    conn.execute(CREATE_DIRECTORIES_TABLE, [])?;
    conn.execute(CREATE_FILES_TABLE, [])?;
    conn.execute(CREATE_METADATA_TABLE, [])?;

    Ok(())
}

/// Create indexes
pub fn create_indexes(conn: &Connection) -> DbResult<()> {
    for sql in CREATE_INDEXES {
        conn.execute(sql, [])?;
    }
    Ok(())
}

/// Apply read-optimized settings
pub fn optimize_for_reads(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(READ_PRAGMAS)?;

    // Update statistics for the query planner
    conn.execute("ANALYZE", [])?;

    Ok(())
}

/// Store a metadata value. Keys are write-once: storing an existing key fails.
pub fn set_metadata(conn: &Connection, key: &str, value: &Value) -> DbResult<()> {
    let encoded = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2)",
        [key, encoded.as_str()],
    )?;
    Ok(())
}

/// Get a metadata value
pub fn get_metadata(conn: &Connection, key: &str) -> DbResult<Option<Value>> {
    let raw: Option<Option<String>> = conn
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;

    match raw.flatten() {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

/// Metadata keys written by the scanner
pub mod keys {
    /// Root path that was scanned
    pub const PATH: &str = "path";

    /// Schema version
    pub const SCHEMA: &str = "schema";

    /// Timestamp when the scan started (RFC 3339)
    pub const SCAN_START: &str = "scan_start";

    /// Scan duration in seconds
    pub const SCRAPE_LENGTH: &str = "scrape_length";

    /// Unix timestamp at which the scan finished
    pub const SCRAPE_TIME: &str = "scrape_time";

    /// Number of worker threads used
    pub const WORKERS: &str = "workers";

    /// Exclusion patterns in effect
    pub const EXCLUDE: &str = "exclude";

    /// fdu version that wrote the database
    pub const FDU_VERSION: &str = "fdu_version";

    /// Number of directories processed
    pub const DIRECTORIES_SCANNED: &str = "directories_scanned";
}
