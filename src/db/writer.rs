//! Record insertion for the scan database
//!
//! All functions take a plain `&Connection` so they can run inside the
//! per-batch transaction owned by the scan coordinator (a `Transaction`
//! dereferences to a `Connection`).
//!
//! File rows are written with multi-row INSERTs, chunked so a single
//! statement never binds more than `FILE_INSERT_CHUNK * FILE_COLUMNS`
//! variables.

use crate::db::records::{name_to_sql, FileRecord, GroupRecord, ScanStatus, UserRecord};
use crate::error::DbResult;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::ffi::OsStr;

/// Number of rows per multi-row file INSERT
pub const FILE_INSERT_CHUNK: usize = 100;

/// Columns bound per file row
const FILE_COLUMNS: usize = 8;

/// Insert a directory record and return its id
pub fn insert_directory(
    conn: &Connection,
    name: impl AsRef<OsStr>,
    parent_id: Option<i64>,
) -> DbResult<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO directories (name, parent_id, scan_status) VALUES (?1, ?2, ?3)",
    )?;
    stmt.execute(params![name_to_sql(name.as_ref()), parent_id, ScanStatus::NotScanned.as_db_int()])?;
    Ok(conn.last_insert_rowid())
}

/// Record the outcome of visiting a directory
pub fn update_directory(
    conn: &Connection,
    id: i64,
    status: ScanStatus,
    mtime: Option<i64>,
) -> DbResult<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE directories SET scan_status = ?1, mtime = COALESCE(?2, mtime) WHERE id = ?3",
    )?;
    stmt.execute(params![status.as_db_int(), mtime, id])?;
    Ok(())
}

/// Bulk insert file records, returning the number of rows written
pub fn insert_files(conn: &Connection, files: &[FileRecord]) -> DbResult<usize> {
    let mut written = 0;

    for chunk in files.chunks(FILE_INSERT_CHUNK) {
        let placeholders: Vec<String> = (0..chunk.len())
            .map(|i| {
                let base = i * FILE_COLUMNS;
                let slots: Vec<String> = (1..=FILE_COLUMNS)
                    .map(|col| format!("?{}", base + col))
                    .collect();
                format!("({})", slots.join(", "))
            })
            .collect();

        let sql = format!(
            "INSERT INTO files (name, directory_id, user_id, group_id, allocated_size, apparent_size, mtime, num_links) VALUES {}",
            placeholders.join(", ")
        );

        // Full chunks share one cached statement; only the tail chunk differs
        let mut stmt = conn.prepare_cached(&sql)?;

        let mut values: Vec<Value> = Vec::with_capacity(chunk.len() * FILE_COLUMNS);
        for file in chunk {
            values.push(name_to_sql(&file.name));
            values.push(file.directory_id.into());
            values.push(i64::from(file.user_id).into());
            values.push(i64::from(file.group_id).into());
            values.push((file.allocated_size as i64).into());
            values.push((file.apparent_size as i64).into());
            values.push(file.mtime.into());
            values.push((file.num_links as i64).into());
        }

        written += stmt.execute(params_from_iter(values))?;
    }

    Ok(written)
}

/// Insert a user record
pub fn insert_user(conn: &Connection, user: &UserRecord) -> DbResult<()> {
    let mut stmt = conn.prepare_cached("INSERT INTO users (uid, name) VALUES (?1, ?2)")?;
    stmt.execute(params![i64::from(user.uid), user.name])?;
    Ok(())
}

/// Insert a group record
pub fn insert_group(conn: &Connection, group: &GroupRecord) -> DbResult<()> {
    let mut stmt = conn.prepare_cached("INSERT INTO user_groups (gid, name) VALUES (?1, ?2)")?;
    stmt.execute(params![i64::from(group.gid), group.name])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_database(&conn).unwrap();
        insert_user(&conn, &UserRecord { uid: 1000, name: "alice".into() }).unwrap();
        insert_group(&conn, &GroupRecord { gid: 100, name: "users".into() }).unwrap();
        conn
    }

    fn file(name: impl Into<OsString>, directory_id: i64) -> FileRecord {
        FileRecord {
            name: name.into(),
            directory_id,
            user_id: 1000,
            group_id: 100,
            allocated_size: 4096,
            apparent_size: 1234,
            mtime: 1_700_000_000,
            num_links: 1,
        }
    }

    #[test]
    fn test_directory_insert_and_update() {
        let conn = setup();
        let root = insert_directory(&conn, "/scratch", None).unwrap();
        let child = insert_directory(&conn, "project", Some(root)).unwrap();
        assert_ne!(root, child);

        update_directory(&conn, child, ScanStatus::Successful, Some(42)).unwrap();

        let (status, mtime, parent): (i64, Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT scan_status, mtime, parent_id FROM directories WHERE id = ?1",
                [child],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(status, ScanStatus::Successful.as_db_int());
        assert_eq!(mtime, Some(42));
        assert_eq!(parent, Some(root));

        // A status change without a timestamp keeps the recorded mtime
        update_directory(&conn, child, ScanStatus::SkippedPermission, None).unwrap();
        let mtime: Option<i64> = conn
            .query_row("SELECT mtime FROM directories WHERE id = ?1", [child], |row| row.get(0))
            .unwrap();
        assert_eq!(mtime, Some(42));
    }

    #[test]
    fn test_insert_files_chunked() {
        let conn = setup();
        let dir = insert_directory(&conn, "/scratch", None).unwrap();

        // Spans three chunks, the last one partial
        let files: Vec<FileRecord> = (0..(FILE_INSERT_CHUNK * 2 + 17))
            .map(|i| file(format!("file{}.dat", i), dir))
            .collect();

        let written = insert_files(&conn, &files).unwrap();
        assert_eq!(written, files.len());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count as usize, files.len());
    }

    #[test]
    fn test_insert_files_empty() {
        let conn = setup();
        assert_eq!(insert_files(&conn, &[]).unwrap(), 0);
    }

    #[test]
    fn test_file_name_unique_per_directory() {
        let conn = setup();
        let a = insert_directory(&conn, "/scratch", None).unwrap();
        let b = insert_directory(&conn, "b", Some(a)).unwrap();

        insert_files(&conn, &[file("same.txt", a)]).unwrap();
        insert_files(&conn, &[file("same.txt", b)]).unwrap();
        assert!(insert_files(&conn, &[file("same.txt", a)]).is_err());
    }

    #[test]
    fn test_non_utf8_file_names_stay_distinct() {
        let conn = setup();
        let dir = insert_directory(&conn, "/scratch", None).unwrap();

        let files = [
            file(OsString::from_vec(vec![0xff]), dir),
            file(OsString::from_vec(vec![0xfe]), dir),
        ];
        assert_eq!(insert_files(&conn, &files).unwrap(), 2);

        // The exact same bytes still collide
        assert!(insert_files(&conn, &[file(OsString::from_vec(vec![0xff]), dir)]).is_err());
    }

    #[test]
    fn test_user_unique() {
        let conn = setup();
        assert!(insert_user(&conn, &UserRecord { uid: 1000, name: "bob".into() }).is_err());
        assert!(insert_user(&conn, &UserRecord { uid: 1001, name: "alice".into() }).is_err());
    }
}
