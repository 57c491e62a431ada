//! fdu - Fast parallel disk usage analysis
//!
//! A du replacement for shared HPC filesystems, where walking a large tree
//! takes hours and metadata I/O is slow. A tree is scanned once, in parallel,
//! into SQLite; afterwards every du-style question is answered from the
//! database.
//!
//! # Features
//!
//! - **Parallel Scanning**: A fixed pool of worker threads lists directories
//!   while a single coordinator persists results and schedules the
//!   subdirectories they discover.
//!
//! - **Incremental Commits**: Finished directories are committed in batches,
//!   one transaction each, so an interrupted scan keeps its progress.
//!
//! - **Resilient**: Unreadable directories are recorded as skipped instead of
//!   aborting the scan; exclusion patterns keep `.git` and `site-packages`
//!   trees out by default.
//!
//! - **Offline Queries**: Subtree totals, per-user totals, subpaths, depth
//!   limits and size filters are computed from the database alone.
//!
//! # Architecture
//!
//! ```text
//!  scan:   filesystem ──► scanner::WorkerPool ──► scanner::ScanCoordinator ──► SQLite
//!
//!  query:  SQLite ──► db::query_totals ──► tree::DirTree ──► report::DirectoryPrinter
//! ```
//!
//! # Example
//!
//! ```bash
//! # Scan with 16 workers
//! fdu scan /scratch/project project.db -j 16
//!
//! # Two levels of subtree sizes and file counts
//! fdu query project.db -d 2 -u H --fields C,S
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod tree;

pub use config::{CliArgs, Command, QueryConfig, ScanConfig};
pub use error::{FduError, Result};
pub use report::query_report;
pub use scanner::{ScanCoordinator, ScanProgress, ScanSummary};
pub use tree::{DirTree, WalkOrder};
