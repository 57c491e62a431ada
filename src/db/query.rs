//! Read-side queries over a finished scan

use crate::db::records::{name_from_row, DirectoryTotals, ScanStatus, UserRecord};
use crate::error::{DbError, DbResult};
use rusqlite::{Connection, OptionalExtension, Row};

/// Every directory with totals over its own files.
///
/// The LEFT OUTER JOIN keeps directories without files; the optional user
/// filter lives in the join condition so those directories survive it too.
const TOTALS_SQL: &str = r#"
SELECT d.id, d.name, d.parent_id, d.mtime, d.scan_status,
       COUNT(f.id),
       IFNULL(SUM(f.allocated_size), 0),
       IFNULL(SUM(f.apparent_size), 0),
       MAX(f.mtime)
FROM directories d
LEFT OUTER JOIN files f ON f.directory_id = d.id
GROUP BY d.id
"#;

const TOTALS_FOR_USER_SQL: &str = r#"
SELECT d.id, d.name, d.parent_id, d.mtime, d.scan_status,
       COUNT(f.id),
       IFNULL(SUM(f.allocated_size), 0),
       IFNULL(SUM(f.apparent_size), 0),
       MAX(f.mtime)
FROM directories d
LEFT OUTER JOIN files f ON f.directory_id = d.id AND f.user_id = ?1
GROUP BY d.id
"#;

/// Load every directory annotated with its per-directory totals
pub fn query_totals(conn: &Connection, user: Option<&UserRecord>) -> DbResult<Vec<DirectoryTotals>> {
    let mut out = Vec::new();

    match user {
        Some(user) => {
            let mut stmt = conn.prepare(TOTALS_FOR_USER_SQL)?;
            let mut rows = stmt.query([i64::from(user.uid)])?;
            while let Some(row) = rows.next()? {
                out.push(totals_from_row(row)?);
            }
        }
        None => {
            let mut stmt = conn.prepare(TOTALS_SQL)?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                out.push(totals_from_row(row)?);
            }
        }
    }

    Ok(out)
}

fn totals_from_row(row: &Row<'_>) -> DbResult<DirectoryTotals> {
    let mtime: Option<i64> = row.get(3)?;
    let newest_file: Option<i64> = row.get(8)?;
    let count: i64 = row.get(5)?;
    let allocated: i64 = row.get(6)?;
    let apparent: i64 = row.get(7)?;

    Ok(DirectoryTotals {
        id: row.get(0)?,
        name: name_from_row(row, 1)?,
        parent_id: row.get(2)?,
        mtime,
        scan_status: ScanStatus::from_db_int(row.get(4)?)?,
        file_count_dir: Some(count as u64),
        allocated_size_dir: Some(allocated as u64),
        apparent_size_dir: Some(apparent as u64),
        mtime_dir: mtime.max(newest_file),
    })
}

/// Look up a user by name
pub fn find_user(conn: &Connection, name: &str) -> DbResult<UserRecord> {
    let uid: Option<i64> = conn
        .query_row("SELECT uid FROM users WHERE name = ?1", [name], |row| row.get(0))
        .optional()?;

    match uid {
        Some(uid) => Ok(UserRecord {
            uid: uid as u32,
            name: name.to_string(),
        }),
        None => Err(DbError::UnknownUser(name.to_string())),
    }
}

/// Count directories recorded with the given status
pub fn count_with_status(conn: &Connection, status: ScanStatus) -> DbResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM directories WHERE scan_status = ?1",
        [status.as_db_int()],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::records::{FileRecord, GroupRecord};
    use crate::db::{schema, writer};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_database(&conn).unwrap();
        writer::insert_user(&conn, &UserRecord { uid: 1000, name: "alice".into() }).unwrap();
        writer::insert_user(&conn, &UserRecord { uid: 1001, name: "bob".into() }).unwrap();
        writer::insert_group(&conn, &GroupRecord { gid: 100, name: "users".into() }).unwrap();
        conn
    }

    fn file(name: &str, directory_id: i64, uid: u32, size: u64, mtime: i64) -> FileRecord {
        FileRecord {
            name: name.into(),
            directory_id,
            user_id: uid,
            group_id: 100,
            allocated_size: size,
            apparent_size: size / 2,
            mtime,
            num_links: 1,
        }
    }

    fn by_name<'a>(rows: &'a [DirectoryTotals], name: &str) -> &'a DirectoryTotals {
        rows.iter().find(|d| d.name == name).unwrap()
    }

    #[test]
    fn test_totals_include_empty_directories() {
        let conn = setup();
        let root = writer::insert_directory(&conn, "/scratch", None).unwrap();
        let full = writer::insert_directory(&conn, "full", Some(root)).unwrap();
        let empty = writer::insert_directory(&conn, "empty", Some(root)).unwrap();
        writer::update_directory(&conn, root, ScanStatus::Successful, Some(10)).unwrap();
        writer::update_directory(&conn, full, ScanStatus::Successful, Some(20)).unwrap();
        writer::update_directory(&conn, empty, ScanStatus::Successful, Some(30)).unwrap();

        writer::insert_files(
            &conn,
            &[
                file("a", full, 1000, 1024, 100),
                file("b", full, 1001, 2048, 200),
            ],
        )
        .unwrap();

        let rows = query_totals(&conn, None).unwrap();
        assert_eq!(rows.len(), 3);

        let full = by_name(&rows, "full");
        assert_eq!(full.file_count_dir, Some(2));
        assert_eq!(full.allocated_size_dir, Some(3072));
        assert_eq!(full.apparent_size_dir, Some(1536));
        assert_eq!(full.mtime_dir, Some(200));

        let empty = by_name(&rows, "empty");
        assert_eq!(empty.file_count_dir, Some(0));
        assert_eq!(empty.allocated_size_dir, Some(0));
        assert_eq!(empty.mtime_dir, Some(30));
    }

    #[test]
    fn test_mtime_absent_for_unscanned_empty_directory() {
        let conn = setup();
        let root = writer::insert_directory(&conn, "/scratch", None).unwrap();
        writer::insert_directory(&conn, "pending", Some(root)).unwrap();

        let rows = query_totals(&conn, None).unwrap();
        let pending = by_name(&rows, "pending");
        assert_eq!(pending.scan_status, ScanStatus::NotScanned);
        assert_eq!(pending.mtime, None);
        assert_eq!(pending.mtime_dir, None);
        assert_eq!(pending.file_count_dir, Some(0));
    }

    #[test]
    fn test_user_filter_keeps_all_directories() {
        let conn = setup();
        let root = writer::insert_directory(&conn, "/scratch", None).unwrap();
        let dir = writer::insert_directory(&conn, "mixed", Some(root)).unwrap();
        writer::insert_files(
            &conn,
            &[
                file("a", dir, 1000, 1024, 100),
                file("b", dir, 1001, 2048, 200),
            ],
        )
        .unwrap();

        let alice = find_user(&conn, "alice").unwrap();
        let rows = query_totals(&conn, Some(&alice)).unwrap();
        assert_eq!(rows.len(), 2);

        let mixed = by_name(&rows, "mixed");
        assert_eq!(mixed.file_count_dir, Some(1));
        assert_eq!(mixed.allocated_size_dir, Some(1024));
        assert_eq!(mixed.mtime_dir, Some(100));
    }

    #[test]
    fn test_find_unknown_user() {
        let conn = setup();
        let err = find_user(&conn, "mallory").unwrap_err();
        assert!(matches!(err, DbError::UnknownUser(ref name) if name == "mallory"));
    }
}
