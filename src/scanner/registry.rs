//! Path to directory-id mapping with lazy ancestor creation
//!
//! Results come back from workers in no particular order, so a directory may
//! be resolved before its parent's own listing has been persisted. Resolving a
//! path creates any missing ancestors first, top-down, and memoizes every id.

use crate::db::writer;
use crate::error::{ScanError, ScanResult};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Memo of directory records created during one scan
#[derive(Debug)]
pub struct DirectoryRegistry {
    root: PathBuf,
    ids: HashMap<PathBuf, i64>,
}

impl DirectoryRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ids: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of directory records created so far
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Id of an already resolved path
    pub fn get(&self, path: &Path) -> Option<i64> {
        self.ids.get(path).copied()
    }

    /// Return the record id for `path`, creating it and any missing ancestors.
    ///
    /// The root record is named by the full root path; every other record by
    /// its last path component.
    pub fn resolve(&mut self, conn: &Connection, path: &Path) -> ScanResult<i64> {
        if let Some(id) = self.get(path) {
            return Ok(id);
        }

        if !path.starts_with(&self.root) {
            return Err(ScanError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.root.clone(),
            });
        }

        // Walk up to the nearest known ancestor (or past the root)
        let mut missing: Vec<&Path> = Vec::new();
        let mut parent_id: Option<i64> = None;
        let mut current = path;
        loop {
            if let Some(id) = self.get(current) {
                parent_id = Some(id);
                break;
            }
            missing.push(current);
            if current == self.root {
                break;
            }
            current = match current.parent() {
                Some(parent) => parent,
                None => break,
            };
        }

        let mut id = 0;
        for dir in missing.into_iter().rev() {
            let name = if dir == self.root {
                dir.as_os_str()
            } else {
                dir.file_name().unwrap_or(dir.as_os_str())
            };
            id = writer::insert_directory(conn, name, parent_id)?;
            trace!(path = %dir.display(), id, "Directory record created");
            self.ids.insert(dir.to_path_buf(), id);
            parent_id = Some(id);
        }

        Ok(id)
    }
}
