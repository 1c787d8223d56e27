//! gqlweave CLI - incremental GraphQL literal type generation
//!
//! Scans JavaScript/TypeScript sources for `gql` literal calls, generates a
//! typed module and declaration per literal, and rewrites the sources to
//! reference them. Unchanged literals are served from the cache.
//!
//! # Usage
//!
//! ```bash
//! # Generate for every configured source, rewriting in place
//! gqlweave gen
//!
//! # Generate for two files, writing rewritten copies under out/
//! gqlweave gen src/pages/index.tsx src/lib/viewer.ts --out-dir out
//!
//! # Show what would be generated or pruned
//! gqlweave plan
//!
//! # Remove generated artifacts and the cache
//! gqlweave clean
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod progress;

/// gqlweave - Typed GraphQL literals, generated incrementally
#[derive(Parser, Debug)]
#[command(name = "gqlweave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Project directory (defaults to the current directory)
    #[arg(long = "cwd", short = 'C', global = true, env = "GQLWEAVE_CWD")]
    cwd: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "GQLWEAVE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate typed artifacts and rewrite sources
    Gen(commands::generate::GenArgs),

    /// Show which literals would be generated, reused or pruned
    Plan(commands::plan::PlanArgs),

    /// Remove generated artifacts and the literal cache
    Clean(commands::clean::CleanArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Gen(args) => commands::generate::execute(args, cli.global).await,
        Commands::Plan(args) => commands::plan::execute(args, cli.global).await,
        Commands::Clean(args) => commands::clean::execute(args, cli.global).await,
    }
}
