//! In-memory directory tree for queries
//!
//! The query side loads every directory with [`crate::db::query_totals`],
//! links the rows into a [`DirTree`], rolls per-directory totals up into
//! subtree totals and then walks the result for reporting.

pub mod aggregate;
pub mod builder;
pub mod walk;

pub use aggregate::{combine_max, combine_sum, Totals};
pub use builder::{min_size, nonempty, DirNode, DirTree, NodeId};
pub use walk::{visit_order, walk_tree, TreeView, WalkOrder};
