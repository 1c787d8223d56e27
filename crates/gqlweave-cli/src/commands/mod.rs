//! CLI command implementations

pub mod clean;
pub mod generate;
pub mod plan;

use std::path::PathBuf;

use anyhow::{Context, Result};
use gqlweave_config::ConfigLoader;
use gqlweave_core::{discover_sources, normalize_source_paths, ExecContext};

use crate::GlobalOptions;

/// Resolve the project directory from options or the current directory.
pub fn resolve_cwd(global: &GlobalOptions) -> Result<PathBuf> {
    match &global.cwd {
        Some(path) => path
            .canonicalize()
            .with_context(|| format!("Project directory not found: {}", path.display())),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

/// Load configuration and build the execution context.
pub fn load_context(global: &GlobalOptions) -> Result<ExecContext> {
    let cwd = resolve_cwd(global)?;
    let loader = match &global.config {
        Some(path) => ConfigLoader::with_config_path(path),
        None => ConfigLoader::new(),
    };
    ExecContext::load(&cwd, &loader).context("Failed to load configuration")
}

/// Sources named on the command line, or every configured source.
pub fn select_sources(ctx: &ExecContext, paths: &[PathBuf]) -> Result<Vec<String>> {
    if paths.is_empty() {
        discover_sources(ctx).context("Failed to discover sources")
    } else {
        Ok(normalize_source_paths(ctx, paths))
    }
}

/// Print a warning message to stderr.
pub fn print_warning(message: &str) {
    eprintln!("warning: {}", message);
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

/// `"1 literal"` / `"2 literals"`.
pub fn plural(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}
