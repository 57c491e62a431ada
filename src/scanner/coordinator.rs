//! Scan coordinator - drives the parallel scan and owns all persistence
//!
//! The coordinator is responsible for:
//! - Spawning the worker pool and seeding it with the scan root
//! - Collecting finished directories in batches (wait for one, drain the rest)
//! - Committing each batch in a single transaction
//! - Deciding which subdirectories are excluded and which become new tasks
//! - Writing scan metadata and building indexes at the end
//!
//! It is the only thread that touches the database, the directory registry
//! or the identity cache, so none of them need locking.

use crate::config::ScanConfig;
use crate::db::records::{FileRecord, ScanStatus};
use crate::db::schema::{self, keys, SCHEMA_VERSION};
use crate::db::writer;
use crate::error::{DbError, ScanResult};
use crate::scanner::identity::{IdentityResolver, NameLookup, SystemLookup};
use crate::scanner::registry::DirectoryRegistry;
use crate::scanner::worker::{DirListing, DirOutcome, TaskResult, WorkerPool};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};
use serde_json::json;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of a completed scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Directories listed successfully
    pub dirs_scanned: u64,

    /// Directories that could not be read
    pub dirs_skipped_permission: u64,

    /// Directories matching an exclusion pattern
    pub dirs_excluded: u64,

    /// File records written
    pub files_recorded: u64,

    /// Sum of allocated sizes
    pub bytes_allocated: u64,

    /// Sum of apparent sizes
    pub bytes_apparent: u64,

    /// Transactions committed
    pub batches: u64,

    /// Wall time of the scan
    pub duration: Duration,
}

/// Snapshot handed to the progress callback after each batch
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Directories processed so far (listed or skipped)
    pub dirs_scanned: u64,

    /// Files recorded so far
    pub files_recorded: u64,

    /// Allocated bytes recorded so far
    pub bytes_allocated: u64,

    /// Directories submitted but not yet finished
    pub outstanding: usize,

    /// Last directory committed
    pub current_path: PathBuf,

    /// Elapsed time
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Calculate dirs per second rate
    pub fn dirs_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.dirs_scanned as f64 / secs
        } else {
            0.0
        }
    }
}

/// Coordinates the parallel scan of one directory tree
pub struct ScanCoordinator {
    config: ScanConfig,
    lookup: Box<dyn NameLookup>,
}

impl ScanCoordinator {
    /// Coordinator resolving names through the host account database
    pub fn new(config: ScanConfig) -> Self {
        Self::with_lookup(config, Box::new(SystemLookup))
    }

    /// Coordinator with a custom name source
    pub fn with_lookup(config: ScanConfig, lookup: Box<dyn NameLookup>) -> Self {
        Self { config, lookup }
    }

    /// Run the scan into `conn`, which must already hold the schema
    pub fn run(self, conn: &mut Connection) -> ScanResult<ScanSummary> {
        self.run_with_progress(conn, |_| {})
    }

    /// Run the scan, reporting after every committed batch
    pub fn run_with_progress<F>(self, conn: &mut Connection, mut on_progress: F) -> ScanResult<ScanSummary>
    where
        F: FnMut(&ScanProgress),
    {
        let ScanCoordinator { config, lookup } = self;
        let start = Instant::now();
        let started_at: DateTime<Utc> = Utc::now();
        let root = config.root.clone();

        info!(
            root = %root.display(),
            workers = config.workers,
            "Starting scan"
        );

        record_scan_start(conn, &config, &started_at)?;

        let mut state = ScanState {
            registry: DirectoryRegistry::new(&root),
            identity: IdentityResolver::new(lookup),
            summary: ScanSummary::default(),
        };

        let pool = WorkerPool::spawn(config.workers)?;
        pool.submit(root.clone())?;
        let mut outstanding: usize = 1;

        while outstanding > 0 {
            // Wait for at least one, then take whatever else is already done
            let mut batch = vec![pool.recv(outstanding)?];
            while let Some(result) = pool.try_recv() {
                batch.push(result);
            }
            outstanding -= batch.len();

            let tx = conn.transaction().map_err(DbError::from)?;
            let mut last_path = root.clone();
            for result in batch {
                last_path = result.path.clone();
                for subdir in state.record_result(&tx, &config, result)? {
                    pool.submit(subdir)?;
                    outstanding += 1;
                }
            }
            tx.commit().map_err(DbError::from)?;
            state.summary.batches += 1;

            let summary = &state.summary;
            on_progress(&ScanProgress {
                dirs_scanned: summary.dirs_scanned + summary.dirs_skipped_permission,
                files_recorded: summary.files_recorded,
                bytes_allocated: summary.bytes_allocated,
                outstanding,
                current_path: last_path,
                elapsed: start.elapsed(),
            });
        }

        pool.shutdown()?;
        let ScanState {
            identity,
            mut summary,
            ..
        } = state;
        summary.duration = start.elapsed();

        record_scan_end(conn, &summary)?;
        schema::create_indexes(conn)?;
        schema::optimize_for_reads(conn)?;

        info!(
            dirs = summary.dirs_scanned,
            skipped = summary.dirs_skipped_permission,
            excluded = summary.dirs_excluded,
            files = summary.files_recorded,
            bytes = summary.bytes_allocated,
            batches = summary.batches,
            users = identity.user_count(),
            duration_secs = summary.duration.as_secs_f64(),
            "Scan completed"
        );

        Ok(summary)
    }
}

fn record_scan_start(conn: &Connection, config: &ScanConfig, started_at: &DateTime<Utc>) -> ScanResult<()> {
    schema::set_metadata(conn, keys::PATH, &json!(config.root.to_string_lossy()))?;
    schema::set_metadata(conn, keys::SCHEMA, &json!(SCHEMA_VERSION))?;
    schema::set_metadata(conn, keys::SCAN_START, &json!(started_at.to_rfc3339()))?;
    schema::set_metadata(conn, keys::WORKERS, &json!(config.workers))?;
    schema::set_metadata(conn, keys::EXCLUDE, &json!(config.exclude_patterns))?;
    schema::set_metadata(conn, keys::FDU_VERSION, &json!(env!("CARGO_PKG_VERSION")))?;
    Ok(())
}

fn record_scan_end(conn: &Connection, summary: &ScanSummary) -> ScanResult<()> {
    let finished = Utc::now().timestamp_millis() as f64 / 1000.0;
    schema::set_metadata(conn, keys::SCRAPE_LENGTH, &json!(summary.duration.as_secs_f64()))?;
    schema::set_metadata(conn, keys::SCRAPE_TIME, &json!(finished))?;
    schema::set_metadata(
        conn,
        keys::DIRECTORIES_SCANNED,
        &json!(summary.dirs_scanned + summary.dirs_skipped_permission),
    )?;
    Ok(())
}

/// Coordinator-owned bookkeeping for one scan
struct ScanState {
    registry: DirectoryRegistry,
    identity: IdentityResolver,
    summary: ScanSummary,
}

impl ScanState {
    /// Persist one finished task and return the subdirectories to scan next
    fn record_result(
        &mut self,
        tx: &Transaction<'_>,
        config: &ScanConfig,
        result: TaskResult,
    ) -> ScanResult<Vec<PathBuf>> {
        match result.outcome? {
            DirOutcome::Listed(listing) => self.record_listing(tx, config, &listing),
            DirOutcome::PermissionDenied(path) => {
                let id = self.registry.resolve(tx, &path)?;
                writer::update_directory(tx, id, ScanStatus::SkippedPermission, None)?;
                self.summary.dirs_skipped_permission += 1;
                Ok(Vec::new())
            }
        }
    }

    fn record_listing(
        &mut self,
        tx: &Transaction<'_>,
        config: &ScanConfig,
        listing: &DirListing,
    ) -> ScanResult<Vec<PathBuf>> {
        let dir_id = self.registry.resolve(tx, &listing.path)?;
        writer::update_directory(tx, dir_id, ScanStatus::Successful, Some(listing.mtime))?;

        let mut records = Vec::with_capacity(listing.files.len());
        for file in &listing.files {
            self.identity.ensure_user(tx, file.uid)?;
            self.identity.ensure_group(tx, file.gid)?;
            self.summary.bytes_allocated += file.allocated_size;
            self.summary.bytes_apparent += file.apparent_size;
            records.push(FileRecord {
                name: file.name.clone(),
                directory_id: dir_id,
                user_id: file.uid,
                group_id: file.gid,
                allocated_size: file.allocated_size,
                apparent_size: file.apparent_size,
                mtime: file.mtime,
                num_links: file.num_links,
            });
        }
        self.summary.files_recorded += writer::insert_files(tx, &records)? as u64;
        self.summary.dirs_scanned += 1;

        let mut new_tasks = Vec::with_capacity(listing.subdirs.len());
        for subdir in &listing.subdirs {
            if config.is_excluded(subdir) {
                let id = self.registry.resolve(tx, subdir)?;
                writer::update_directory(tx, id, ScanStatus::SkippedExclude, None)?;
                self.summary.dirs_excluded += 1;
                debug!(path = %subdir.display(), "Excluded");
            } else {
                new_tasks.push(subdir.clone());
            }
        }

        Ok(new_tasks)
    }
}
