//! Clean command - Remove generated artifacts and the literal cache
//!
//! Removes:
//! - the cache directory (typed modules and `literals.json`)
//! - generated declarations under the entrypoint directory
//! - the combined declaration entrypoint

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::{load_context, print_info};
use crate::GlobalOptions;

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Show what would be deleted without actually deleting
    #[arg(long, short = 'n')]
    dry_run: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Result of the clean operation
#[derive(Debug, Clone, Serialize)]
pub struct CleanResult {
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Paths that were (or would be) removed
    pub removed: Vec<RemovedPath>,
}

/// One removed path
#[derive(Debug, Clone, Serialize)]
pub struct RemovedPath {
    pub path: String,
    /// Size of deleted data in bytes
    pub size_bytes: u64,
}

/// Execute the clean command
pub async fn execute(args: CleanArgs, global: GlobalOptions) -> Result<()> {
    let ctx = load_context(&global)?;

    let targets: Vec<PathBuf> = vec![
        ctx.cache_full_dir().to_path_buf(),
        ctx.dts_full_dir().join(ctx.types_root_dir()),
        ctx.dts_entrypoint_full_path(),
    ];

    let mut result = CleanResult {
        dry_run: args.dry_run,
        removed: Vec::new(),
    };

    for target in targets.iter().filter(|t| t.exists()) {
        let size_bytes = dir_size(target)?;
        if !args.dry_run {
            remove_path(target)
                .await
                .with_context(|| format!("Failed to remove {}", target.display()))?;
        }
        let path = target
            .strip_prefix(ctx.cwd())
            .unwrap_or(target)
            .display()
            .to_string();
        result.removed.push(RemovedPath { path, size_bytes });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_clean_result(&result, global.quiet);
    }

    Ok(())
}

async fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}

fn print_clean_result(result: &CleanResult, quiet: bool) {
    if result.removed.is_empty() {
        print_info("Nothing to clean.", quiet);
        return;
    }

    let verb = if result.dry_run { "Would remove" } else { "Removed" };
    for removed in &result.removed {
        print_info(
            &format!("{} {} ({})", verb, removed.path, format_size(removed.size_bytes)),
            quiet,
        );
    }
}

/// Calculate total size of a file or directory
fn dir_size(path: &Path) -> Result<u64> {
    if path.is_file() {
        return Ok(std::fs::metadata(path)
            .context("Failed to get file metadata")?
            .len());
    }

    let total = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.metadata().map(|m| m.len()).unwrap_or(0))
        .sum();
    Ok(total)
}

/// Format a size in bytes as a human-readable string
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
