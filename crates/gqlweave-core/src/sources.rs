//! Source discovery.
//!
//! Walks the working directory with the `ignore` crate (so `.gitignore` and
//! `.gqlweaveignore` files apply) and keeps files that match the configured
//! `sources` patterns, are not matched by `exclude`, and have a scannable
//! extension.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use gqlweave_config::ConfigError;
use ignore::WalkBuilder;
use tracing::debug;

use crate::context::ExecContext;
use crate::error::Result;
use crate::paths::to_slash;
use crate::scanner::SourceDialect;

/// Custom ignore file honored during discovery.
pub const IGNORE_FILE_NAME: &str = ".gqlweaveignore";

/// Find every source file selected by the configuration.
///
/// Returns `/`-separated paths relative to the working directory, sorted.
pub fn discover_sources(ctx: &ExecContext) -> Result<Vec<String>> {
    let config = ctx.config();
    let include = build_glob_set("sources", &config.sources)?;
    let exclude = build_glob_set("exclude", &config.exclude)?;
    let root = ctx.cwd();

    let walker = WalkBuilder::new(root)
        .follow_links(false)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .add_custom_ignore_filename(IGNORE_FILE_NAME)
        .filter_entry(|entry| entry.file_name() != "node_modules")
        .build();

    let mut sources = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Error walking directory: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        if SourceDialect::from_path(path).is_none() {
            continue;
        }
        let rel_path = to_slash(path.strip_prefix(root).unwrap_or(path));
        if include.is_match(&rel_path) && !exclude.is_match(&rel_path) {
            sources.push(rel_path);
        }
    }

    sources.sort();
    debug!("Discovered {} sources", sources.len());
    Ok(sources)
}

/// Normalize user-supplied paths to `/`-separated paths relative to the
/// working directory.
pub fn normalize_source_paths(ctx: &ExecContext, paths: &[impl AsRef<Path>]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            let rel = if p.is_absolute() {
                p.strip_prefix(ctx.cwd()).unwrap_or(p)
            } else {
                p
            };
            to_slash(rel)
        })
        .collect()
}

fn build_glob_set(key: &str, patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| ConfigError::invalid_value(key, format!("invalid pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| ConfigError::invalid_value(key, e.to_string()))?;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlweave_config::GqlConfig;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discover_applies_patterns() {
        let temp = TempDir::new().unwrap();
        for rel in [
            "src/pages/index.tsx",
            "src/lib/client.ts",
            "src/lib/types.d.ts",
            "src/dist/bundle.ts",
            "src/styles.css",
            "scripts/build.ts",
            "node_modules/pkg/src/index.ts",
        ] {
            touch(temp.path(), rel);
        }
        let ctx = ExecContext::new(temp.path(), GqlConfig::default(), "h".to_string()).unwrap();

        assert_eq!(
            discover_sources(&ctx).unwrap(),
            vec!["src/lib/client.ts", "src/pages/index.tsx"]
        );
    }

    #[test]
    fn test_custom_ignore_file() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/a.ts");
        touch(temp.path(), "src/generated/b.ts");
        std::fs::write(temp.path().join(IGNORE_FILE_NAME), "src/generated/\n").unwrap();
        let ctx = ExecContext::new(temp.path(), GqlConfig::default(), "h".to_string()).unwrap();

        assert_eq!(discover_sources(&ctx).unwrap(), vec!["src/a.ts"]);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let temp = TempDir::new().unwrap();
        let config = GqlConfig {
            sources: vec!["src/[".to_string()],
            ..Default::default()
        };
        let ctx = ExecContext::new(temp.path(), config, "h".to_string()).unwrap();

        assert!(matches!(
            discover_sources(&ctx),
            Err(crate::error::PipelineError::Config(
                ConfigError::InvalidValue { .. }
            ))
        ));
    }

    #[test]
    fn test_normalize_source_paths() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecContext::new(temp.path(), GqlConfig::default(), "h".to_string()).unwrap();
        let paths = vec![
            temp.path().join("src/a.ts"),
            std::path::PathBuf::from("./src/b.ts"),
            std::path::PathBuf::from("src/c.tsx"),
        ];

        assert_eq!(
            normalize_source_paths(&ctx, &paths),
            vec!["src/a.ts", "src/b.ts", "src/c.tsx"]
        );
    }
}
