//! Plan command - Show what `gen` would do without touching any files

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use gqlweave_core::{
    resolve_schema_hash, CommandEngine, LiteralPipeline, PipelineOptions, SourceOutcome,
};
use serde::Serialize;

use super::{load_context, plural, print_info, print_warning, select_sources};
use crate::GlobalOptions;

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Source files to inspect (defaults to the configured `sources`)
    paths: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Planned work for one source
#[derive(Debug, Clone, Serialize)]
pub struct SourcePlanView {
    /// Source path relative to the project directory
    pub source: String,
    /// Literals that need generation
    pub generate: Vec<LiteralView>,
    /// Literals already satisfied by the cache
    pub cached: Vec<LiteralView>,
    /// Cached fingerprints that would be pruned
    pub prune: Vec<String>,
}

/// One literal in the plan
#[derive(Debug, Clone, Serialize)]
pub struct LiteralView {
    pub hash: String,
    pub declaration: String,
}

impl From<&SourceOutcome> for SourcePlanView {
    fn from(outcome: &SourceOutcome) -> Self {
        let mut generate: Vec<LiteralView> = Vec::new();
        let mut cached: Vec<LiteralView> = Vec::new();
        for record in &outcome.records {
            let target = if record.skip {
                &mut cached
            } else {
                &mut generate
            };
            if target.iter().any(|l| l.hash == record.hash) {
                continue;
            }
            target.push(LiteralView {
                hash: record.hash.clone(),
                declaration: record.paths.declaration_rel_path.clone(),
            });
        }
        Self {
            source: outcome.source_rel_path.clone(),
            generate,
            cached,
            prune: outcome.stale.clone(),
        }
    }
}

/// Execute the plan command
pub async fn execute(args: PlanArgs, global: GlobalOptions) -> Result<()> {
    let ctx = load_context(&global)?;
    let sources = select_sources(&ctx, &args.paths)?;

    let schema_hash = resolve_schema_hash(&ctx)
        .await
        .context("Failed to hash schema")?;
    let engine = CommandEngine::from_config(&ctx.config().engine);

    let report = LiteralPipeline::new(&ctx, &engine, schema_hash)
        .with_options(PipelineOptions {
            dry_run: true,
            ..Default::default()
        })
        .run(&sources)
        .await
        .context("Failed to plan literal generation")?;

    let plans: Vec<SourcePlanView> = report.processed.iter().map(SourcePlanView::from).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
    } else {
        print_plans(&plans, global.quiet);
    }

    for failure in &report.failures {
        print_warning(&format!("{}: {}", failure.source_rel_path, failure.error));
    }
    if !report.is_success() {
        anyhow::bail!(
            "{} could not be scanned",
            plural(report.failures.len(), "source")
        );
    }

    Ok(())
}

fn print_plans(plans: &[SourcePlanView], quiet: bool) {
    if plans.is_empty() {
        print_info("No literals found.", quiet);
        return;
    }

    for plan in plans {
        println!("{}", plan.source);
        for literal in &plan.generate {
            println!("  + {}", literal.declaration);
        }
        for literal in &plan.cached {
            println!("  = {}", literal.declaration);
        }
        for hash in &plan.prune {
            println!("  - {}", hash);
        }
    }

    let generate: usize = plans.iter().map(|p| p.generate.len()).sum();
    let cached: usize = plans.iter().map(|p| p.cached.len()).sum();
    let prune: usize = plans.iter().map(|p| p.prune.len()).sum();
    print_info(
        &format!(
            "\n{} to generate, {} cached, {} to prune",
            plural(generate, "literal"),
            cached,
            prune
        ),
        quiet,
    );
}
