//! Combined declaration entrypoint.
//!
//! Declares one overload of each literal function per cached literal, keyed
//! by the exact literal text, so type checkers resolve `gql(`...`)` calls to
//! the generated declaration without rewriting.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use tracing::info;

use crate::cache::LiteralCache;
use crate::context::ExecContext;
use crate::error::{PipelineError, Result};
use crate::paths::{join_slash, relative_specifier, DECLARATION_EXTENSION};

const HEADER: &str = "// Generated by gqlweave. Do not edit.\n";

/// Render the entrypoint for every literal currently in `cache`.
pub fn render_entrypoint(ctx: &ExecContext, cache: &LiteralCache) -> String {
    let entry_dir = ctx.dts_full_dir();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut overloads: Vec<(String, String)> = Vec::new();

    for (_, partition) in cache.iter() {
        for entry in partition.values() {
            if !seen.insert(entry.literal.as_str()) {
                continue;
            }
            let declaration = join_slash(ctx.cwd(), &entry.declaration_rel_path);
            let specifier = relative_specifier(&entry_dir, &declaration, DECLARATION_EXTENSION);
            overloads.push((entry.literal.clone(), specifier));
        }
    }

    let mut out = String::from(HEADER);
    let literals = &ctx.config().literals;
    for module in &literals.modules {
        let _ = writeln!(out, "\ndeclare module '{module}' {{");
        for function in &literals.functions {
            for (literal, specifier) in &overloads {
                let _ = writeln!(
                    out,
                    "  export function {function}(literal: `{literal}`): typeof import('{specifier}');"
                );
            }
            let _ = writeln!(out, "  export function {function}(literal: string): unknown;");
        }
        out.push_str("}\n");
    }
    out
}

/// Write the entrypoint to `gql_dts_entrypoint`.
pub async fn write_entrypoint(ctx: &ExecContext, cache: &LiteralCache) -> Result<PathBuf> {
    let path = ctx.dts_entrypoint_full_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(parent, e))?;
    }
    tokio::fs::write(&path, render_entrypoint(ctx, cache))
        .await
        .map_err(|e| PipelineError::io(&path, e))?;
    info!(
        "Wrote declaration entrypoint {:?} ({} literals)",
        path,
        cache.entry_count()
    );
    Ok(path)
}
