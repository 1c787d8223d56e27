//! Gen command - Generate typed artifacts and rewrite sources

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use gqlweave_core::{
    resolve_schema_hash, CommandEngine, LiteralPipeline, PipelineOptions, RewriteTarget,
    RunReport,
};
use tracing::info;

use super::{load_context, plural, print_info, print_warning, select_sources};
use crate::progress::{finish_spinner, finish_spinner_warn, spinner};
use crate::GlobalOptions;

/// Arguments for the gen command
#[derive(Args, Debug)]
pub struct GenArgs {
    /// Source files to process (defaults to the configured `sources`)
    paths: Vec<PathBuf>,

    /// Write rewritten sources under this directory instead of in place
    #[arg(long, short = 'o')]
    out_dir: Option<PathBuf>,

    /// Skip writing the combined declaration entrypoint
    #[arg(long)]
    no_entrypoint: bool,
}

/// Execute the gen command
pub async fn execute(args: GenArgs, global: GlobalOptions) -> Result<()> {
    let ctx = load_context(&global)?;
    let sources = select_sources(&ctx, &args.paths)?;

    if sources.is_empty() {
        print_info("No sources matched; nothing to do.", global.quiet);
        return Ok(());
    }

    let schema_hash = resolve_schema_hash(&ctx)
        .await
        .context("Failed to hash schema")?;
    let engine = CommandEngine::from_config(&ctx.config().engine);
    info!("Using engine '{}'", ctx.config().engine.program);

    let options = PipelineOptions {
        rewrite_target: match args.out_dir {
            Some(dir) => RewriteTarget::Directory(dir),
            None => RewriteTarget::InPlace,
        },
        write_entrypoint: !args.no_entrypoint,
        ..Default::default()
    };

    let pb = spinner(
        &format!("Processing {}...", plural(sources.len(), "source")),
        global.quiet,
    );

    let report = LiteralPipeline::new(&ctx, &engine, schema_hash)
        .with_options(options)
        .run(&sources)
        .await
        .context("Literal generation failed")?;

    let summary = summarize(&report);
    if report.is_success() {
        finish_spinner(pb, &summary);
    } else {
        finish_spinner_warn(pb, &summary);
    }

    if global.verbose && !global.quiet {
        for outcome in &report.processed {
            println!(
                "  {}: {} generated, {} cached, {} pruned",
                outcome.source_rel_path,
                outcome.generated,
                outcome.skipped(),
                outcome.stale.len()
            );
        }
    }

    for failure in &report.failures {
        print_warning(&format!("{}: {}", failure.source_rel_path, failure.error));
    }

    if !report.is_success() {
        anyhow::bail!(
            "{} failed to process",
            plural(report.failures.len(), "source")
        );
    }

    Ok(())
}

fn summarize(report: &RunReport) -> String {
    format!(
        "Processed {} ({} generated, {} cached, {} pruned, {} without literals)",
        plural(report.processed.len(), "source"),
        plural(report.generated(), "literal"),
        report.skipped(),
        report.stale(),
        report.unchanged.len()
    )
}
