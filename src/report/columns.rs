//! du-style rendering of an aggregated tree
//!
//! Column codes:
//! - `c`/`C`: file count of the directory / subtree
//! - `s`/`S`: allocated size of the directory / subtree
//! - `a`/`A`: apparent size of the directory / subtree
//! - `t`/`T`: newest mtime of the directory / subtree

use crate::error::ReportError;
use crate::report::units::{format_size, SizeUnit};
use crate::tree::{walk_tree, DirNode, DirTree, WalkOrder};
use chrono::{Local, TimeZone};
use std::io::{self, Write};

/// Placeholder for values that were never measured
const ABSENT: &str = "-";

const NUMBER_WIDTH: usize = 10;
const TIME_WIDTH: usize = 16;

/// One report column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    FileCountDir,
    FileCountTree,
    AllocatedSizeDir,
    AllocatedSizeTree,
    ApparentSizeDir,
    ApparentSizeTree,
    MtimeDir,
    MtimeTree,
}

impl Column {
    pub fn from_code(code: &str) -> Result<Self, ReportError> {
        match code {
            "c" => Ok(Column::FileCountDir),
            "C" => Ok(Column::FileCountTree),
            "s" => Ok(Column::AllocatedSizeDir),
            "S" => Ok(Column::AllocatedSizeTree),
            "a" => Ok(Column::ApparentSizeDir),
            "A" => Ok(Column::ApparentSizeTree),
            "t" => Ok(Column::MtimeDir),
            "T" => Ok(Column::MtimeTree),
            other => Err(ReportError::UnsupportedColumn(other.to_string())),
        }
    }

    pub fn code(self) -> char {
        match self {
            Column::FileCountDir => 'c',
            Column::FileCountTree => 'C',
            Column::AllocatedSizeDir => 's',
            Column::AllocatedSizeTree => 'S',
            Column::ApparentSizeDir => 'a',
            Column::ApparentSizeTree => 'A',
            Column::MtimeDir => 't',
            Column::MtimeTree => 'T',
        }
    }

    pub fn width(self) -> usize {
        match self {
            Column::MtimeDir | Column::MtimeTree => TIME_WIDTH,
            _ => NUMBER_WIDTH,
        }
    }
}

/// Parse a comma separated list of column codes
pub fn parse_columns(fields: &str) -> Result<Vec<Column>, ReportError> {
    fields.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(Column::from_code)
        .collect()
}

/// Rendering options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub columns: Vec<Column>,
    pub unit: SizeUnit,
    pub quota: bool,
    /// ISO-8601 local time instead of Unix seconds
    pub isotime: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            columns: vec![Column::AllocatedSizeTree],
            unit: SizeUnit::default(),
            quota: false,
            isotime: true,
        }
    }
}

/// Formats directories as report lines
#[derive(Debug, Clone)]
pub struct DirectoryPrinter {
    options: ReportOptions,
}

impl DirectoryPrinter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    fn size(&self, value: Option<u64>) -> String {
        value.map_or_else(
            || ABSENT.to_string(),
            |v| format_size(v, self.options.unit, self.options.quota),
        )
    }

    fn time(&self, value: Option<i64>) -> String {
        match value {
            Some(secs) if self.options.isotime => Local
                .timestamp_opt(secs, 0)
                .single()
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
                .unwrap_or_else(|| secs.to_string()),
            Some(secs) => secs.to_string(),
            None => ABSENT.to_string(),
        }
    }

    fn cell(&self, column: Column, node: &DirNode) -> String {
        let count = |v: Option<u64>| v.map_or_else(|| ABSENT.to_string(), |v| v.to_string());
        match column {
            Column::FileCountDir => count(node.dir.file_count),
            Column::FileCountTree => count(node.tree.file_count),
            Column::AllocatedSizeDir => self.size(node.dir.allocated_size),
            Column::AllocatedSizeTree => self.size(node.tree.allocated_size),
            Column::ApparentSizeDir => self.size(node.dir.apparent_size),
            Column::ApparentSizeTree => self.size(node.tree.apparent_size),
            Column::MtimeDir => self.time(node.dir.mtime),
            Column::MtimeTree => self.time(node.tree.mtime),
        }
    }

    /// One report line: padded columns then the path
    pub fn format_node(&self, node: &DirNode) -> String {
        let mut line = String::new();
        for &column in &self.options.columns {
            line.push_str(&format!("{:<width$} ", self.cell(column, node), width = column.width()));
        }
        line.push_str(&node.path.display().to_string());
        line
    }

    /// Lines for the tree in pre-order, down to `max_depth`
    pub fn render(&self, tree: &DirTree, max_depth: Option<usize>) -> Vec<String> {
        let mut lines = Vec::new();
        walk_tree(tree, tree.root(), WalkOrder::Pre, max_depth, |t, node, _| {
            lines.push(self.format_node(t.get(node)));
        });
        lines
    }

    /// Write the rendered report
    pub fn write<W: Write>(&self, tree: &DirTree, max_depth: Option<usize>, mut out: W) -> io::Result<()> {
        for line in self.render(tree, max_depth) {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::records::DirectoryTotals;

    fn tree() -> DirTree {
        let mut root = DirectoryTotals::empty(1, "/scratch", None);
        root.file_count_dir = Some(1);
        root.allocated_size_dir = Some(1024);
        root.mtime_dir = Some(1_700_000_000);
        let mut child = DirectoryTotals::empty(2, "data", Some(1));
        child.file_count_dir = Some(3);
        child.allocated_size_dir = Some(20 * 1024);
        let mut grandchild = DirectoryTotals::empty(3, "raw", Some(2));
        grandchild.file_count_dir = None;
        grandchild.allocated_size_dir = None;
        DirTree::build(vec![root, child, grandchild]).unwrap()
    }

    #[test]
    fn test_parse_columns() {
        assert_eq!(
            parse_columns("c,S,T").unwrap(),
            vec![Column::FileCountDir, Column::AllocatedSizeTree, Column::MtimeTree]
        );
        assert_eq!(
            parse_columns("S,x").unwrap_err(),
            ReportError::UnsupportedColumn("x".into())
        );
        for code in ["c", "C", "s", "S", "a", "A", "t", "T"] {
            assert_eq!(Column::from_code(code).unwrap().code().to_string(), code);
        }
    }

    #[test]
    fn test_render_pre_order() {
        let printer = DirectoryPrinter::new(ReportOptions {
            columns: vec![Column::FileCountTree, Column::AllocatedSizeTree],
            unit: SizeUnit::Kilo,
            quota: false,
            isotime: false,
        });

        let lines = printer.render(&tree(), None);
        assert_eq!(
            lines,
            vec![
                format!("{:<10} {:<10} /scratch", "4", "21K"),
                format!("{:<10} {:<10} /scratch/data", "3", "20K"),
                format!("{:<10} {:<10} /scratch/data/raw", "-", "-"),
            ]
        );
    }

    #[test]
    fn test_render_depth_limit() {
        let printer = DirectoryPrinter::new(ReportOptions::default());
        assert_eq!(printer.render(&tree(), Some(1)).len(), 1);
        assert_eq!(printer.render(&tree(), Some(2)).len(), 2);
    }

    #[test]
    fn test_time_columns() {
        let t = tree();
        let root = t.get(t.root());

        let raw = DirectoryPrinter::new(ReportOptions {
            columns: vec![Column::MtimeDir],
            isotime: false,
            ..ReportOptions::default()
        });
        assert_eq!(raw.format_node(root), format!("{:<16} /scratch", "1700000000"));

        let iso = DirectoryPrinter::new(ReportOptions {
            columns: vec![Column::MtimeDir],
            ..ReportOptions::default()
        });
        let line = iso.format_node(root);
        let stamp = line.split_whitespace().next().unwrap();
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[10..11], "T");
    }

    #[test]
    fn test_write() {
        let printer = DirectoryPrinter::new(ReportOptions::default());
        let mut out = Vec::new();
        printer.write(&tree(), None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with("/scratch/data/raw\n"));
    }
}
