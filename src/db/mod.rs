//! SQLite persistence for scan results
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Worker Threads (N)                     │
//! │  - stat + list one directory, send DirListing       │
//! └─────────────────────┬───────────────────────────────┘
//!                       │ results channel
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │              Scan Coordinator                       │
//! │  - drains completed listings into a batch           │
//! │  - one transaction per batch                        │
//! │  - chunked multi-row file INSERTs                   │
//! └─────────────────────┬───────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────────────┐
//! │              SQLite File                            │
//! │  users, user_groups, directories, files, metadata   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The query side reads everything back in one pass through
//! [`query::query_totals`] and hands the rows to the tree builder.

pub mod query;
pub mod records;
pub mod schema;
pub mod writer;

pub use query::{find_user, query_totals};
pub use records::{DirectoryTotals, FileRecord, GroupRecord, ScanStatus, UserRecord};
pub use schema::{create_database, create_indexes, keys, optimize_for_reads};
