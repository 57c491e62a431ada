//! fdu - Fast parallel disk usage analysis
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use fdu::config::{CliArgs, Command, QueryArgs, QueryConfig, ScanArgs, ScanConfig};
use fdu::db::schema;
use fdu::progress::{print_header, print_summary, ProgressReporter};
use fdu::report::query_report;
use fdu::scanner::ScanCoordinator;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    match &args.command {
        Command::Scan(scan) => run_scan(scan, args.verbose),
        Command::Query(query) => run_query(query),
    }
}

fn run_scan(args: &ScanArgs, verbose: bool) -> Result<()> {
    let config = ScanConfig::from_args(args, verbose).context("Invalid configuration")?;

    remove_existing(&config.output)?;

    let mut conn = if config.in_memory {
        Connection::open_in_memory().context("Failed to open in-memory database")?
    } else {
        Connection::open(&config.output)
            .with_context(|| format!("Failed to create database '{}'", config.output.display()))?
    };
    schema::create_database(&conn).context("Failed to create schema")?;

    if config.show_progress {
        print_header(&config.root, config.workers, &config.output);
    }

    let progress = config.show_progress.then(ProgressReporter::new);
    if let Some(ref p) = progress {
        p.set_status("Starting workers...");
    }

    let coordinator = ScanCoordinator::new(config.clone());
    let result = coordinator.run_with_progress(&mut conn, |snapshot| {
        if let Some(ref p) = progress {
            p.update(snapshot);
        }
    });

    if let Some(ref p) = progress {
        p.finish_and_clear();
    }
    let summary = result.context("Scan failed")?;

    if config.in_memory {
        info!(output = %config.output.display(), "Writing database");
        let output = config.output.to_string_lossy();
        conn.execute("VACUUM INTO ?1", [&*output])
            .with_context(|| format!("Failed to write '{}'", config.output.display()))?;
    }

    conn.close()
        .map_err(|(_, e)| e)
        .context("Failed to close database")?;

    if config.show_progress {
        let db_size = fs::metadata(&config.output).ok().map(|m| m.len());
        print_summary(&summary, &config.output, db_size);
    }

    Ok(())
}

fn run_query(args: &QueryArgs) -> Result<()> {
    let config = QueryConfig::from_args(args).context("Invalid configuration")?;

    let conn = Connection::open_with_flags(
        &config.input,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open '{}'", config.input.display()))?;

    let lines = query_report(&conn, &config).context("Query failed")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    Ok(())
}

/// A scan always starts from an empty database
fn remove_existing(output: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = output.as_os_str().to_owned();
        name.push(suffix);
        let path = Path::new(&name);
        if path.exists() {
            info!(path = %path.display(), "Removing existing database file");
            fs::remove_file(path).with_context(|| format!("Failed to remove '{}'", path.display()))?;
        }
    }
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("fdu=debug,warn")
    } else {
        EnvFilter::new("fdu=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
