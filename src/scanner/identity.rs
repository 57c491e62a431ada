//! uid/gid to user/group records
//!
//! Each distinct id is looked up and persisted at most once per scan. Names
//! come from a [`NameLookup`]; the system implementation asks the account
//! database through `getpwuid_r`/`getgrgid_r`.

use crate::db::records::{GroupRecord, UserRecord};
use crate::db::writer;
use crate::error::DbResult;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::ffi::CStr;
use tracing::debug;

/// Largest buffer handed to the libc `*_r` lookups
const MAX_LOOKUP_BUFFER: usize = 1 << 20;

/// Source of account names
pub trait NameLookup {
    fn user_name(&self, uid: u32) -> Option<String>;
    fn group_name(&self, gid: u32) -> Option<String>;
}

/// Account database of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl NameLookup for SystemLookup {
    fn user_name(&self, uid: u32) -> Option<String> {
        let mut buf: Vec<libc::c_char> = vec![0; 1024];
        loop {
            let mut entry: libc::passwd = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::passwd = std::ptr::null_mut();

            let rc = unsafe {
                libc::getpwuid_r(
                    uid as libc::uid_t,
                    &mut entry,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };

            if rc == libc::ERANGE && buf.len() < MAX_LOOKUP_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() || entry.pw_name.is_null() {
                return None;
            }

            // pw_name points into `buf`, which is still alive here
            let name = unsafe { CStr::from_ptr(entry.pw_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        let mut buf: Vec<libc::c_char> = vec![0; 1024];
        loop {
            let mut entry: libc::group = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::group = std::ptr::null_mut();

            let rc = unsafe {
                libc::getgrgid_r(
                    gid as libc::gid_t,
                    &mut entry,
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };

            if rc == libc::ERANGE && buf.len() < MAX_LOOKUP_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() || entry.gr_name.is_null() {
                return None;
            }

            let name = unsafe { CStr::from_ptr(entry.gr_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }
}

/// Fixed name table, for tests and benchmarks
#[derive(Debug, Clone, Default)]
pub struct FixedLookup {
    users: HashMap<u32, String>,
    groups: HashMap<u32, String>,
}

impl FixedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, uid: u32, name: impl Into<String>) -> Self {
        self.users.insert(uid, name.into());
        self
    }

    pub fn group(mut self, gid: u32, name: impl Into<String>) -> Self {
        self.groups.insert(gid, name.into());
        self
    }
}

impl NameLookup for FixedLookup {
    fn user_name(&self, uid: u32) -> Option<String> {
        self.users.get(&uid).cloned()
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        self.groups.get(&gid).cloned()
    }
}

/// Creates user and group records on first sight
pub struct IdentityResolver {
    lookup: Box<dyn NameLookup>,
    users: HashSet<u32>,
    groups: HashSet<u32>,
    user_names: HashSet<String>,
    group_names: HashSet<String>,
}

impl IdentityResolver {
    pub fn new(lookup: Box<dyn NameLookup>) -> Self {
        Self {
            lookup,
            users: HashSet::new(),
            groups: HashSet::new(),
            user_names: HashSet::new(),
            group_names: HashSet::new(),
        }
    }

    /// Persist the user record for `uid` unless already done
    pub fn ensure_user(&mut self, conn: &Connection, uid: u32) -> DbResult<()> {
        if !self.users.insert(uid) {
            return Ok(());
        }

        let name = unique_name(self.lookup.user_name(uid), uid, &mut self.user_names);
        debug!(uid, name = %name, "New user");
        writer::insert_user(conn, &UserRecord { uid, name })
    }

    /// Persist the group record for `gid` unless already done
    pub fn ensure_group(&mut self, conn: &Connection, gid: u32) -> DbResult<()> {
        if !self.groups.insert(gid) {
            return Ok(());
        }

        let name = unique_name(self.lookup.group_name(gid), gid, &mut self.group_names);
        debug!(gid, name = %name, "New group");
        writer::insert_group(conn, &GroupRecord { gid, name })
    }

    /// Distinct users seen so far
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Distinct groups seen so far
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Fall back to the decimal id for unknown or already used names
fn unique_name(name: Option<String>, id: u32, used: &mut HashSet<String>) -> String {
    let name = match name {
        Some(name) if !used.contains(&name) => name,
        _ => id.to_string(),
    };
    used.insert(name.clone());
    name
}
