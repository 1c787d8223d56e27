//! Source rewriting.
//!
//! Literal calls are replaced by a namespace reference to the generated typed
//! module, and one namespace import per distinct fingerprint is added:
//!
//! ```ts
//! // before
//! import { gql } from 'graphql-let';
//! const q = gql(`query Viewer { viewer { id } }`);
//!
//! // after
//! import * as V3f5a... from '../node_modules/.cache/gqlweave/proj-root/src/a.ts-3f5a...';
//! const q = V3f5a...;
//! ```
//!
//! Rewrites are collected as a batch of `(handle, replacement)` edits against
//! the scanned text and applied in one pass, so no edit can shift another.

use std::path::Path;

use thiserror::Error;

use crate::paths::{relative_specifier, MODULE_EXTENSION};
use crate::scanner::{NodeHandle, ScannedSource};

/// Prefix of the identifier bound to each generated module.
pub const REFERENCE_PREFIX: &str = "V";

/// Errors that can occur while rewriting.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// Occurrences and artifacts disagree
    #[error("expected {expected} artifact references, got {actual}")]
    ArtifactCount { expected: usize, actual: usize },

    /// Two edits cover the same text
    #[error("overlapping edits at bytes {first_start}..{first_end} and {second_start}..{second_end}")]
    OverlappingEdits {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    /// An edit points outside the source
    #[error("edit {start}..{end} is outside the source ({len} bytes)")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Generated artifact that replaces one literal occurrence.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactRef<'a> {
    /// Literal fingerprint
    pub hash: &'a str,
    /// Absolute path of the typed module
    pub module_full_path: &'a Path,
}

/// A single replacement instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub handle: NodeHandle,
    pub replacement: String,
}

impl Edit {
    /// Replace the text covered by `handle`.
    pub fn replace(handle: NodeHandle, replacement: impl Into<String>) -> Self {
        Self {
            handle,
            replacement: replacement.into(),
        }
    }

    /// Insert text at a byte offset.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(
            NodeHandle {
                start_byte: at,
                end_byte: at,
            },
            text,
        )
    }
}

/// Identifier referencing the module generated for `hash`.
pub fn reference_ident(hash: &str) -> String {
    format!("{REFERENCE_PREFIX}{hash}")
}

/// Apply a batch of edits to `source` in a single pass.
///
/// Edits are ordered by position; insertions at the same offset keep their
/// batch order. Overlapping replacements are rejected.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> Result<String, RewriteError> {
    edits.sort_by_key(|e| (e.handle.start_byte, e.handle.end_byte));

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    let mut previous: Option<NodeHandle> = None;

    for edit in &edits {
        let NodeHandle {
            start_byte,
            end_byte,
        } = edit.handle;
        if start_byte > end_byte
            || end_byte > source.len()
            || !source.is_char_boundary(start_byte)
            || !source.is_char_boundary(end_byte)
        {
            return Err(RewriteError::OutOfBounds {
                start: start_byte,
                end: end_byte,
                len: source.len(),
            });
        }
        if start_byte < cursor {
            let prev = previous.unwrap_or(edit.handle);
            return Err(RewriteError::OverlappingEdits {
                first_start: prev.start_byte,
                first_end: prev.end_byte,
                second_start: start_byte,
                second_end: end_byte,
            });
        }

        out.push_str(&source[cursor..start_byte]);
        out.push_str(&edit.replacement);
        cursor = end_byte;
        previous = Some(edit.handle);
    }

    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Rewrite a scanned source so each literal call references its artifact.
///
/// Fingerprints the source already imports (see
/// [`ScannedSource::reference_imports`]) are not imported a second time.
///
/// * `artifacts` - one entry per occurrence, in occurrence order
/// * `output_dir` - absolute directory the rewritten file will live in;
///   import specifiers are relative to it
pub fn rewrite_source(
    scanned: &ScannedSource,
    artifacts: &[ArtifactRef<'_>],
    output_dir: &Path,
) -> Result<String, RewriteError> {
    if artifacts.len() != scanned.occurrences.len() {
        return Err(RewriteError::ArtifactCount {
            expected: scanned.occurrences.len(),
            actual: artifacts.len(),
        });
    }

    let mut edits = Vec::with_capacity(artifacts.len() + scanned.literal_imports.len() + 1);
    // Modules imported by an earlier rewrite are already bound
    let mut imported: Vec<&str> = scanned.referenced_hashes().collect();
    let mut import_lines: Vec<String> = Vec::new();

    for (occurrence, artifact) in scanned.occurrences.iter().zip(artifacts) {
        edits.push(Edit::replace(occurrence.call, reference_ident(artifact.hash)));

        if !imported.contains(&artifact.hash) {
            imported.push(artifact.hash);
            let specifier =
                relative_specifier(output_dir, artifact.module_full_path, MODULE_EXTENSION);
            import_lines.push(format!(
                "import * as {} from '{}';",
                reference_ident(artifact.hash),
                specifier
            ));
        }
    }

    let import_block = import_lines.join("\n");
    match scanned.literal_imports.split_first() {
        Some((first, rest)) => {
            edits.push(Edit::replace(*first, import_block));
            edits.extend(rest.iter().map(|handle| Edit::replace(*handle, "")));
        }
        None if !import_block.is_empty() => {
            edits.push(Edit::insert(
                preamble_end(&scanned.text),
                format!("{import_block}\n"),
            ));
        }
        None => {}
    }

    apply_edits(&scanned.text, edits)
}

/// Offset after a leading hashbang line, where imports may be inserted.
fn preamble_end(source: &str) -> usize {
    if source.starts_with("#!") {
        source.find('\n').map(|i| i + 1).unwrap_or(source.len())
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::LiteralScanner;
    use gqlweave_config::LiteralsConfig;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn handle(start_byte: usize, end_byte: usize) -> NodeHandle {
        NodeHandle {
            start_byte,
            end_byte,
        }
    }

    #[test]
    fn test_apply_edits_single_pass() {
        let source = "aaa bbb ccc";
        let edits = vec![
            Edit::replace(handle(8, 11), "third"),
            Edit::replace(handle(0, 3), "first"),
            Edit::replace(handle(4, 7), "second"),
        ];
        assert_eq!(apply_edits(source, edits).unwrap(), "first second third");
    }

    #[test]
    fn test_apply_edits_rejects_overlap() {
        let edits = vec![
            Edit::replace(handle(0, 5), "x"),
            Edit::replace(handle(3, 7), "y"),
        ];
        assert!(matches!(
            apply_edits("0123456789", edits),
            Err(RewriteError::OverlappingEdits { .. })
        ));
    }

    #[test]
    fn test_apply_edits_rejects_out_of_bounds() {
        let edits = vec![Edit::replace(handle(2, 20), "x")];
        assert!(matches!(
            apply_edits("short", edits),
            Err(RewriteError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_rewrite_replaces_every_literal() {
        let source = "import { gql } from 'graphql-let';\n\
                      const a = gql(`{ a }`);\n\
                      const b = gql(`{ b }`);\n\
                      const again = gql(`{ a }`);\n";
        let scanned = LiteralScanner::new(&LiteralsConfig::default())
            .scan(Path::new("a.ts"), source.to_string())
            .unwrap();
        assert_eq!(scanned.occurrences.len(), 3);

        let module_a = PathBuf::from("/p/.cache/proj-root/src/a.ts-ha.tsx");
        let module_b = PathBuf::from("/p/.cache/proj-root/src/a.ts-hb.tsx");
        let artifacts = [
            ArtifactRef {
                hash: "ha",
                module_full_path: &module_a,
            },
            ArtifactRef {
                hash: "hb",
                module_full_path: &module_b,
            },
            ArtifactRef {
                hash: "ha",
                module_full_path: &module_a,
            },
        ];

        let rewritten = rewrite_source(&scanned, &artifacts, Path::new("/p/src")).unwrap();
        assert_eq!(
            rewritten,
            "import * as Vha from '../.cache/proj-root/src/a.ts-ha';\n\
             import * as Vhb from '../.cache/proj-root/src/a.ts-hb';\n\
             const a = Vha;\n\
             const b = Vhb;\n\
             const again = Vha;\n"
        );
        assert!(!rewritten.contains("gql("));
    }

    #[test]
    fn test_rewrite_inserts_after_hashbang_when_import_is_kept() {
        let source = "#!/usr/bin/env node\nimport { gql, other } from 'graphql-let';\nconst a = gql(`{ a }`);\n";
        let scanned = LiteralScanner::new(&LiteralsConfig::default())
            .scan(Path::new("a.js"), source.to_string())
            .unwrap();
        let module = PathBuf::from("/p/src/gen/a-h.tsx");
        let rewritten = rewrite_source(
            &scanned,
            &[ArtifactRef {
                hash: "h",
                module_full_path: &module,
            }],
            Path::new("/p/src"),
        )
        .unwrap();

        assert_eq!(
            rewritten,
            "#!/usr/bin/env node\nimport * as Vh from './gen/a-h';\nimport { gql, other } from 'graphql-let';\nconst a = Vh;\n"
        );
    }

    #[test]
    fn test_rewrite_reuses_existing_reference_import() {
        let source = "import * as Vab12 from '../.cache/proj-root/src/a.ts-ab12';\n\
                      import { gql } from 'graphql-let';\n\
                      const a = Vab12;\n\
                      const again = gql(`{ a }`);\n\
                      const b = gql(`{ b }`);\n";
        let scanned = LiteralScanner::new(&LiteralsConfig::default())
            .scan(Path::new("a.ts"), source.to_string())
            .unwrap();
        let module_a = PathBuf::from("/p/.cache/proj-root/src/a.ts-ab12.tsx");
        let module_b = PathBuf::from("/p/.cache/proj-root/src/a.ts-cd34.tsx");
        let artifacts = [
            ArtifactRef {
                hash: "ab12",
                module_full_path: &module_a,
            },
            ArtifactRef {
                hash: "cd34",
                module_full_path: &module_b,
            },
        ];

        let rewritten = rewrite_source(&scanned, &artifacts, Path::new("/p/src")).unwrap();
        assert_eq!(
            rewritten,
            "import * as Vab12 from '../.cache/proj-root/src/a.ts-ab12';\n\
             import * as Vcd34 from '../.cache/proj-root/src/a.ts-cd34';\n\
             const a = Vab12;\n\
             const again = Vab12;\n\
             const b = Vcd34;\n"
        );
        assert_eq!(rewritten.matches("import * as Vab12").count(), 1);
    }

    #[test]
    fn test_rewrite_artifact_count_mismatch() {
        let source = "import { gql } from 'graphql-let';\nconst a = gql(`{ a }`);\n";
        let scanned = LiteralScanner::new(&LiteralsConfig::default())
            .scan(Path::new("a.ts"), source.to_string())
            .unwrap();
        assert!(matches!(
            rewrite_source(&scanned, &[], Path::new("/p")),
            Err(RewriteError::ArtifactCount {
                expected: 1,
                actual: 0
            })
        ));
    }
}
