//! Report formatting for the query command

pub mod columns;
pub mod units;

pub use columns::{parse_columns, Column, DirectoryPrinter, ReportOptions};
pub use units::{format_size, parse_size, SizeUnit};

use crate::config::QueryConfig;
use crate::db::{find_user, query_totals};
use crate::error::Result;
use crate::tree::{min_size, nonempty, DirTree};
use rusqlite::Connection;
use tracing::debug;

/// Load the scan behind `conn`, shape the tree as `config` asks and render it
pub fn query_report(conn: &Connection, config: &QueryConfig) -> Result<Vec<String>> {
    let user = config
        .user
        .as_deref()
        .map(|name| find_user(conn, name))
        .transpose()?;

    let mut tree = DirTree::build(query_totals(conn, user.as_ref())?)?;

    if let Some(subpath) = &config.subpath {
        let node = tree.extract_subtree(subpath)?;
        tree.reroot(node);
    }

    if !config.show_all {
        tree.filter(nonempty);
    }

    if let Some(size) = config.min_size {
        tree.filter(min_size(size));
    }

    debug!(directories = tree.reachable(), "Rendering report");

    let printer = DirectoryPrinter::new(config.report.clone());
    Ok(printer.render(&tree, config.max_depth))
}
