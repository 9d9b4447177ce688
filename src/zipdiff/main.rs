//! Dataset diff tool.
//!
//! Compares two versions of the postal code dataset and reports added and
//! removed codes, field changes and state membership changes.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use zipgeo::compare::diff_stores;
use zipgeo::store::load_path;
use zipgeo::CodeStore;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "zipdiff")]
#[command(about = "Compare two versions of the postal code dataset")]
struct Args {
    /// Previous dataset (file or directory)
    old: PathBuf,

    /// New dataset (file or directory)
    new: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Exit with status 1 when the datasets differ
    #[arg(long)]
    fail_on_diff: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr so the report on stdout stays clean
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let old = load_path(&args.old)
        .with_context(|| format!("Failed to load old dataset {}", args.old.display()))?;
    let new = load_path(&args.new)
        .with_context(|| format!("Failed to load new dataset {}", args.new.display()))?;

    info!(
        "Comparing {} old codes against {} new codes",
        old.len(),
        new.len()
    );

    let diff = diff_stores(&old, &new);

    match args.format {
        OutputFormat::Text => print!("{}", diff),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
    }

    info!(
        "{} added, {} removed, {} modified",
        diff.added.len(),
        diff.removed.len(),
        diff.changed.len()
    );

    if args.fail_on_diff && !diff.is_empty() {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
