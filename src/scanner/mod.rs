//! Parallel directory scanner
//!
//! # Architecture
//!
//! ```text
//!             submit(path)                      TaskResult
//! ┌─────────────┐ ───────────► ┌────────────┐ ───────────► ┌─────────────┐
//! │ Coordinator │   tasks      │ Workers(N) │   results    │ Coordinator │
//! └─────────────┘              └────────────┘              └──────┬──────┘
//!        ▲                                                        │ batch
//!        │            new subdirectories                          ▼
//!        └──────────────────────────────────────────────  SQLite transaction
//! ```
//!
//! Workers only do filesystem I/O. The coordinator resolves paths to
//! directory records ([`registry`]), uid/gid to user/group records
//! ([`identity`]) and writes every finished batch in one transaction.

pub mod coordinator;
pub mod identity;
pub mod registry;
pub mod worker;

pub use coordinator::{ScanCoordinator, ScanProgress, ScanSummary};
pub use identity::{FixedLookup, IdentityResolver, NameLookup, SystemLookup};
pub use registry::DirectoryRegistry;
pub use worker::{process_dir, DirListing, DirOutcome, FileStat, WorkerPool};
