//! Configuration types for fdu
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Validated runtime configuration for the `scan` and `query` commands
//! - Exclusion pattern matching

use crate::error::ConfigError;
use crate::report::{parse_columns, parse_size, ReportOptions, SizeUnit};
use clap::{Args, Parser, Subcommand};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
pub const MAX_WORKERS: usize = 512;

/// Exclusion patterns used when none are given
pub const DEFAULT_EXCLUDES: &[&str] = &[r".*/\.git", r".*/site-packages"];

/// Fast parallel disk usage analysis
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fdu",
    version,
    about = "Fast parallel disk usage analysis",
    long_about = "Scans a directory tree in parallel into a SQLite database, then answers\n\
                  du-style questions about it without touching the filesystem again.",
    after_help = "EXAMPLES:\n    \
        fdu scan /scratch/project project.db -j 16\n    \
        fdu scan /home/me home.db -X '.*/\\.cache' --in-memory\n    \
        fdu query project.db -d 2 -u H --fields C,S,T\n    \
        fdu query project.db --subpath /scratch/project/data --user alice"
)]
pub struct CliArgs {
    /// Verbose output (debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan the tree at PATH and save the results into OUTPUT
    Scan(ScanArgs),

    /// Print a du-like report from a scan database
    Query(QueryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output database file (replaced if it exists)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Number of worker threads
    #[arg(short = 'j', long, default_value_t = default_workers(), value_name = "NUM")]
    pub workers: usize,

    /// Build the database in memory and write it out at the end
    #[arg(long)]
    pub in_memory: bool,

    /// Exclude directories whose full path matches this regex (can be repeated)
    #[arg(short = 'X', long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Scan database to read
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Maximum depth of tree to print (0 prints everything)
    #[arg(short = 'd', long, value_name = "NUM")]
    pub depth: Option<usize>,

    /// Units to print sizes in (B, K, M, G, T, P, or H for human readable)
    #[arg(short = 'u', long, default_value = "K", value_name = "UNIT")]
    pub unit: String,

    /// Print sizes in quota units (base-10 multiples of 1024 bytes)
    #[arg(short = 'q', long)]
    pub quota: bool,

    /// Comma separated list of column codes (c, C, s, S, a, A, t, T)
    #[arg(long, default_value = "S", value_name = "CODES")]
    pub fields: String,

    /// Only report the subtree rooted at this path
    #[arg(long, value_name = "PATH")]
    pub subpath: Option<PathBuf>,

    /// Also print directory trees without any files
    #[arg(long)]
    pub all: bool,

    /// Only count files owned by this user
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Only print directories whose subtree is larger than this (e.g. 10G)
    #[arg(long, value_name = "SIZE")]
    pub min_size: Option<String>,

    /// Print timestamps as Unix seconds instead of ISO-8601
    #[arg(long)]
    pub no_isotime: bool,
}

fn default_workers() -> usize {
    num_cpus::get().clamp(1, MAX_WORKERS)
}

/// Validated configuration for a scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Absolute scan root
    pub root: PathBuf,

    /// Output database path
    pub output: PathBuf,

    /// Number of worker threads
    pub workers: usize,

    /// Build in memory, then write out
    pub in_memory: bool,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,

    /// Exclusion patterns as given
    pub exclude_patterns: Vec<String>,

    /// Compiled, fully anchored exclusion patterns
    exclude: Vec<Regex>,
}

impl ScanConfig {
    /// Configuration with default workers and exclusions
    pub fn new(root: impl AsRef<Path>, output: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = validate_root(root.as_ref())?;
        let output = validate_output(output.into())?;
        let exclude_patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
        let exclude = compile_excludes(&exclude_patterns)?;

        Ok(Self {
            root,
            output,
            workers: default_workers(),
            in_memory: false,
            show_progress: false,
            verbose: false,
            exclude_patterns,
            exclude,
        })
    }

    /// Set the worker count
    pub fn with_workers(mut self, workers: usize) -> Result<Self, ConfigError> {
        if workers == 0 || workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: workers,
                max: MAX_WORKERS,
            });
        }
        self.workers = workers;
        Ok(self)
    }

    /// Replace the exclusion patterns
    pub fn with_excludes<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, ConfigError> {
        self.exclude_patterns = patterns.iter().map(|p| p.as_ref().to_string()).collect();
        self.exclude = compile_excludes(&self.exclude_patterns)?;
        Ok(self)
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: &ScanArgs, verbose: bool) -> Result<Self, ConfigError> {
        let mut config = Self::new(&args.path, args.output.clone())?.with_workers(args.workers)?;
        if !args.exclude_patterns.is_empty() {
            config = config.with_excludes(&args.exclude_patterns[..])?;
        }
        config.in_memory = args.in_memory;
        config.show_progress = !args.quiet;
        config.verbose = verbose;
        Ok(config)
    }

    /// Check if a directory should be skipped. Patterns must match the whole path.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }
        let path = path.to_string_lossy();
        self.exclude.iter().any(|re| re.is_match(&path))
    }
}

fn validate_root(root: &Path) -> Result<PathBuf, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidRoot {
        path: root.to_path_buf(),
        reason,
    };

    let meta = std::fs::metadata(root).map_err(|e| invalid(e.to_string()))?;
    if !meta.is_dir() {
        return Err(invalid("not a directory".into()));
    }

    let absolute = std::path::absolute(root).map_err(|e| invalid(e.to_string()))?;
    // Drops trailing separators and `.` components
    Ok(absolute.components().collect())
}

fn validate_output(output: PathBuf) -> Result<PathBuf, ConfigError> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ConfigError::InvalidOutputPath {
                reason: format!("Parent directory '{}' does not exist", parent.display()),
                path: output,
            });
        }
    }
    if output.is_dir() {
        return Err(ConfigError::InvalidOutputPath {
            path: output,
            reason: "is a directory".into(),
        });
    }
    Ok(output)
}

fn compile_excludes(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("^(?:{})$", p)).map_err(|e| ConfigError::InvalidExcludePattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Validated configuration for a query
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Scan database
    pub input: PathBuf,

    /// Maximum depth to print
    pub max_depth: Option<usize>,

    /// Column, unit and time settings
    pub report: ReportOptions,

    /// Subtree to report instead of the whole scan
    pub subpath: Option<PathBuf>,

    /// Keep trees without files
    pub show_all: bool,

    /// Restrict totals to this user's files
    pub user: Option<String>,

    /// Minimum subtree allocated size, exclusive
    pub min_size: Option<u64>,
}

impl QueryConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: &QueryArgs) -> Result<Self, ConfigError> {
        if !args.input.is_file() {
            return Err(ConfigError::InvalidInput {
                path: args.input.clone(),
                reason: "no such file".into(),
            });
        }

        let unit: SizeUnit = args.unit.parse()?;
        let columns = parse_columns(&args.fields)?;
        let min_size = args.min_size.as_deref().map(parse_size).transpose()?;

        Ok(Self {
            input: args.input.clone(),
            // A depth of zero means no limit
            max_depth: args.depth.filter(|&d| d > 0),
            report: ReportOptions {
                columns,
                unit,
                quota: args.quota,
                isotime: !args.no_isotime,
            },
            subpath: args.subpath.clone(),
            show_all: args.all,
            user: args.user.clone(),
            min_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::report::Column;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_default_excludes_full_match() {
        let dir = TempDir::new().unwrap();
        let config = ScanConfig::new(dir.path(), dir.path().join("out.db")).unwrap();

        assert!(config.is_excluded(Path::new("/data/project/.git")));
        assert!(config.is_excluded(Path::new("/data/venv/lib/site-packages")));
        assert!(!config.is_excluded(Path::new("/data/project/.github")));
        assert!(!config.is_excluded(Path::new("/data/project/.git/objects")));
    }

    #[test]
    fn test_custom_excludes_replace_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ScanConfig::new(dir.path(), dir.path().join("out.db"))
            .unwrap()
            .with_excludes(&[r".*/\.snapshot"])
            .unwrap();

        assert!(config.is_excluded(Path::new("/data/.snapshot")));
        assert!(!config.is_excluded(Path::new("/data/.git")));

        let config = config.with_excludes::<&str>(&[]).unwrap();
        assert!(!config.is_excluded(Path::new("/data/.snapshot")));
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let dir = TempDir::new().unwrap();
        let err = ScanConfig::new(dir.path(), dir.path().join("out.db"))
            .unwrap()
            .with_excludes(&["(unclosed"])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExcludePattern { .. }));
    }

    #[test]
    fn test_worker_bounds() {
        let dir = TempDir::new().unwrap();
        let config = ScanConfig::new(dir.path(), dir.path().join("out.db")).unwrap();
        assert!(config.clone().with_workers(0).is_err());
        assert!(config.clone().with_workers(MAX_WORKERS + 1).is_err());
        assert_eq!(config.with_workers(8).unwrap().workers, 8);
    }

    #[test]
    fn test_root_validation() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            ScanConfig::new(&file, dir.path().join("out.db")),
            Err(ConfigError::InvalidRoot { .. })
        ));
        assert!(matches!(
            ScanConfig::new(dir.path().join("missing"), dir.path().join("out.db")),
            Err(ConfigError::InvalidRoot { .. })
        ));
        assert!(matches!(
            ScanConfig::new(dir.path(), dir.path().join("nope/out.db")),
            Err(ConfigError::InvalidOutputPath { .. })
        ));
    }

    #[test]
    fn test_root_is_normalized() {
        let dir = TempDir::new().unwrap();
        let with_slash = format!("{}/", dir.path().display());
        let config = ScanConfig::new(&with_slash, dir.path().join("out.db")).unwrap();
        assert_eq!(config.root, dir.path());
        assert!(config.root.is_absolute());
    }

    #[test]
    fn test_scan_args() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let out = dir.path().join("out.db");
        let out = out.to_str().unwrap();

        let args = parse(&["fdu", "scan", root, out, "-j", "3", "-X", "a", "-X", "b", "--in-memory"]);
        let Command::Scan(scan) = args.command else {
            panic!("expected scan");
        };
        let config = ScanConfig::from_args(&scan, args.verbose).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.exclude_patterns, vec!["a", "b"]);
        assert!(config.in_memory);
        assert!(config.show_progress);
    }

    #[test]
    fn test_query_args() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("scan.db");
        std::fs::write(&db, b"").unwrap();
        let db = db.to_str().unwrap();

        let args = parse(&[
            "fdu", "query", db, "-d", "2", "-u", "h", "--fields", "C,S", "--min-size", "1K", "--all",
        ]);
        let Command::Query(query) = args.command else {
            panic!("expected query");
        };
        let config = QueryConfig::from_args(&query).unwrap();
        assert_eq!(config.max_depth, Some(2));
        assert_eq!(config.report.unit, SizeUnit::Human);
        assert_eq!(
            config.report.columns,
            vec![Column::FileCountTree, Column::AllocatedSizeTree]
        );
        assert_eq!(config.min_size, Some(1024));
        assert!(config.show_all);
        assert!(config.report.isotime);
    }

    #[test]
    fn test_query_depth_zero_is_unlimited() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("scan.db");
        std::fs::write(&db, b"").unwrap();

        let args = parse(&["fdu", "query", db.to_str().unwrap(), "-d", "0"]);
        let Command::Query(query) = args.command else {
            panic!("expected query");
        };
        let config = QueryConfig::from_args(&query).unwrap();
        assert_eq!(config.max_depth, None);

        // Untouched options match the library defaults
        assert_eq!(config.report, ReportOptions::default());
        assert_eq!(config.report.unit, SizeUnit::default());
    }

    #[test]
    fn test_query_rejects_bad_options() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("scan.db");
        std::fs::write(&db, b"").unwrap();
        let db = db.to_str().unwrap();

        let bad_column = parse(&["fdu", "query", db, "--fields", "S,z"]);
        let Command::Query(query) = bad_column.command else {
            panic!("expected query");
        };
        assert!(matches!(
            QueryConfig::from_args(&query),
            Err(ConfigError::Report(ReportError::UnsupportedColumn(_)))
        ));

        let bad_size = parse(&["fdu", "query", db, "--min-size", "lots"]);
        let Command::Query(query) = bad_size.command else {
            panic!("expected query");
        };
        assert!(matches!(
            QueryConfig::from_args(&query),
            Err(ConfigError::Report(ReportError::InvalidSize(_)))
        ));

        let missing = parse(&["fdu", "query", "/definitely/not/here.db"]);
        let Command::Query(query) = missing.command else {
            panic!("expected query");
        };
        assert!(matches!(
            QueryConfig::from_args(&query),
            Err(ConfigError::InvalidInput { .. })
        ));
    }
}
