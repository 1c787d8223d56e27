//! Tree-sitter scanner for embedded query literals.
//!
//! A literal is a call whose callee identifier is bound by an import of a
//! configured literal function from a configured module, and whose only
//! argument is a template string without substitutions:
//!
//! ```ts
//! import { gql } from 'graphql-let';
//! const { data } = useQuery(gql(`query Viewer { viewer { id } }`));
//! ```
//!
//! ## Supported Languages
//!
//! - JavaScript (.js, .jsx, .mjs, .cjs)
//! - TypeScript (.ts, .mts, .cts)
//! - TSX (.tsx)

use std::collections::{HashMap, HashSet};
use std::path::Path;

use gqlweave_config::LiteralsConfig;
use thiserror::Error;
use tracing::{debug, warn};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use crate::rewriter::REFERENCE_PREFIX;

/// Query locating candidate literal calls, embedded at compile time.
const LITERAL_CALLS_QUERY: &str = include_str!("../queries/literal-calls.scm");

// ============================================================================
// Source Dialects
// ============================================================================

/// Source dialects the scanner can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceDialect {
    JavaScript,
    TypeScript,
    Tsx,
}

impl SourceDialect {
    /// Get the tree-sitter Language for this dialect.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            SourceDialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SourceDialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceDialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Detect dialect from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceDialect::JavaScript),
            "ts" | "mts" | "cts" => Some(SourceDialect::TypeScript),
            "tsx" => Some(SourceDialect::Tsx),
            _ => None,
        }
    }

    /// Detect dialect from file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

// ============================================================================
// Scan Results
// ============================================================================

/// Byte range of a syntax node in the original source text.
///
/// Handles always refer to the text as scanned, so rewriting one handle
/// never invalidates another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle {
    pub start_byte: usize,
    pub end_byte: usize,
}

impl NodeHandle {
    fn of(node: &Node<'_>) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    /// Text covered by this handle.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start_byte..self.end_byte]
    }
}

/// One recognized literal call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOccurrence {
    /// Raw text between the backticks
    pub literal: String,
    /// The whole call expression to replace
    pub call: NodeHandle,
}

/// A namespace import of a generated module left by an earlier rewrite:
///
/// ```ts
/// import * as V3f5a... from '../node_modules/.cache/gqlweave/proj-root/src/a.ts-3f5a...';
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImport {
    /// Fingerprint of the referenced literal
    pub hash: String,
    /// The import statement
    pub statement: NodeHandle,
}

/// Result of scanning one source file.
#[derive(Debug, Clone)]
pub struct ScannedSource {
    /// Source text the handles refer to
    pub text: String,
    /// Dialect the text was parsed as
    pub dialect: SourceDialect,
    /// Literal calls in source order
    pub occurrences: Vec<LiteralOccurrence>,
    /// Import statements that only bind literal functions
    pub literal_imports: Vec<NodeHandle>,
    /// Generated modules the source already imports
    pub reference_imports: Vec<ReferenceImport>,
}

impl ScannedSource {
    /// Whether the file contains no literal calls.
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Fingerprints of generated modules the source already imports.
    pub fn referenced_hashes(&self) -> impl Iterator<Item = &str> {
        self.reference_imports.iter().map(|r| r.hash.as_str())
    }
}

/// Errors that can occur while scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Unsupported file extension
    #[error("unsupported language for file: {0}")]
    UnsupportedLanguage(String),

    /// Failed to set language
    #[error("failed to set language: {0}")]
    LanguageSet(String),

    /// Failed to compile query
    #[error("failed to compile query: {0}")]
    QueryCompile(String),

    /// Failed to parse source code
    #[error("failed to parse source code")]
    ParseFailed,
}

// ============================================================================
// Literal Scanner
// ============================================================================

struct Grammar {
    parser: Parser,
    query: Query,
    callee_index: u32,
    literal_index: u32,
    call_index: u32,
}

impl Grammar {
    fn new(dialect: SourceDialect) -> Result<Self, ScanError> {
        let language = dialect.tree_sitter_language();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ScanError::LanguageSet(e.to_string()))?;
        let query = Query::new(&language, LITERAL_CALLS_QUERY)
            .map_err(|e| ScanError::QueryCompile(format!("{:?}", e)))?;

        let index = |name: &str| {
            query
                .capture_index_for_name(name)
                .ok_or_else(|| ScanError::QueryCompile(format!("missing capture @{name}")))
        };
        let callee_index = index("callee")?;
        let literal_index = index("literal")?;
        let call_index = index("call")?;

        Ok(Self {
            parser,
            query,
            callee_index,
            literal_index,
            call_index,
        })
    }
}

/// Locates literal calls in JavaScript and TypeScript sources.
///
/// Parsers and compiled queries are created lazily per dialect and reused
/// across files.
pub struct LiteralScanner {
    modules: HashSet<String>,
    functions: HashSet<String>,
    grammars: HashMap<SourceDialect, Grammar>,
}

impl LiteralScanner {
    /// Create a scanner recognizing the configured literal functions.
    pub fn new(config: &LiteralsConfig) -> Self {
        Self {
            modules: config.modules.iter().cloned().collect(),
            functions: config.functions.iter().cloned().collect(),
            grammars: HashMap::new(),
        }
    }

    /// Scan a source file. The dialect is taken from `path`'s extension.
    pub fn scan(&mut self, path: &Path, text: String) -> Result<ScannedSource, ScanError> {
        let dialect = SourceDialect::from_path(path)
            .ok_or_else(|| ScanError::UnsupportedLanguage(path.display().to_string()))?;
        self.scan_as(dialect, text)
    }

    /// Scan source text as the given dialect.
    pub fn scan_as(
        &mut self,
        dialect: SourceDialect,
        text: String,
    ) -> Result<ScannedSource, ScanError> {
        let grammar = match self.grammars.entry(dialect) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => entry.insert(Grammar::new(dialect)?),
        };

        let tree = grammar
            .parser
            .parse(&text, None)
            .ok_or(ScanError::ParseFailed)?;
        let root = tree.root_node();
        if root.has_error() {
            warn!("Source has syntax errors; scanning recoverable nodes only");
        }

        let source = text.as_bytes();
        let (bindings, literal_imports) =
            collect_literal_imports(&root, source, &self.modules, &self.functions);
        let reference_imports = collect_reference_imports(&root, source);

        let mut occurrences = Vec::new();
        if !bindings.is_empty() {
            let mut cursor = QueryCursor::new();
            let mut matches = cursor.matches(&grammar.query, root, source);
            while let Some(match_) = matches.next() {
                let mut callee = None;
                let mut literal = None;
                let mut call = None;
                for capture in match_.captures {
                    if capture.index == grammar.callee_index {
                        callee = Some(capture.node);
                    } else if capture.index == grammar.literal_index {
                        literal = Some(capture.node);
                    } else if capture.index == grammar.call_index {
                        call = Some(capture.node);
                    }
                }
                let (Some(callee), Some(literal), Some(call)) = (callee, literal, call) else {
                    continue;
                };

                let name = callee.utf8_text(source).unwrap_or("");
                if !bindings.contains(name) {
                    continue;
                }
                if has_substitution(&literal) {
                    debug!(
                        "Skipping {}() call at byte {} with template substitutions",
                        name,
                        call.start_byte()
                    );
                    continue;
                }

                let inner = &text[literal.start_byte() + 1..literal.end_byte() - 1];
                occurrences.push(LiteralOccurrence {
                    literal: inner.to_string(),
                    call: NodeHandle::of(&call),
                });
            }
        }

        occurrences.sort_by_key(|o| o.call);
        occurrences.dedup_by_key(|o| o.call);

        Ok(ScannedSource {
            text,
            dialect,
            occurrences,
            literal_imports,
            reference_imports,
        })
    }
}

/// Find local names bound to literal functions, and import statements that
/// bind nothing else.
fn collect_literal_imports(
    root: &Node<'_>,
    source: &[u8],
    modules: &HashSet<String>,
    functions: &HashSet<String>,
) -> (HashSet<String>, Vec<NodeHandle>) {
    let mut bindings = HashSet::new();
    let mut removable = Vec::new();

    let mut cursor = root.walk();
    for statement in root.named_children(&mut cursor) {
        if statement.kind() != "import_statement" {
            continue;
        }
        let Some(module) = statement
            .child_by_field_name("source")
            .and_then(|s| s.utf8_text(source).ok())
            .map(unquote)
        else {
            continue;
        };
        if !modules.contains(module) {
            continue;
        }

        let mut recognized = 0usize;
        let mut other = 0usize;
        let mut clause_cursor = statement.walk();
        for clause in statement.named_children(&mut clause_cursor) {
            if clause.kind() != "import_clause" {
                continue;
            }
            let mut part_cursor = clause.walk();
            for part in clause.named_children(&mut part_cursor) {
                if part.kind() != "named_imports" {
                    other += 1;
                    continue;
                }
                let mut spec_cursor = part.walk();
                for specifier in part.named_children(&mut spec_cursor) {
                    if specifier.kind() != "import_specifier" {
                        continue;
                    }
                    let imported = specifier
                        .child_by_field_name("name")
                        .and_then(|n| n.utf8_text(source).ok())
                        .map(unquote)
                        .unwrap_or("");
                    let local = specifier
                        .child_by_field_name("alias")
                        .and_then(|n| n.utf8_text(source).ok())
                        .unwrap_or(imported);

                    if functions.contains(imported) {
                        bindings.insert(local.to_string());
                        recognized += 1;
                    } else {
                        other += 1;
                    }
                }
            }
        }

        if recognized > 0 && other == 0 {
            removable.push(NodeHandle::of(&statement));
        }
    }

    (bindings, removable)
}

/// Find `import * as V<hash> from '...-<hash>'` statements.
fn collect_reference_imports(root: &Node<'_>, source: &[u8]) -> Vec<ReferenceImport> {
    let mut references = Vec::new();

    let mut cursor = root.walk();
    for statement in root.named_children(&mut cursor) {
        if statement.kind() != "import_statement" {
            continue;
        }
        let Some(specifier) = statement
            .child_by_field_name("source")
            .and_then(|s| s.utf8_text(source).ok())
            .map(unquote)
        else {
            continue;
        };

        let mut clause_cursor = statement.walk();
        let clauses: Vec<Node<'_>> = statement
            .named_children(&mut clause_cursor)
            .filter(|n| n.kind() == "import_clause")
            .collect();
        let [clause] = clauses.as_slice() else {
            continue;
        };
        if clause.named_child_count() != 1 {
            continue;
        }
        let Some(namespace) = clause.named_child(0).filter(|n| n.kind() == "namespace_import")
        else {
            continue;
        };
        let Some(ident) = namespace
            .named_child(0)
            .and_then(|n| n.utf8_text(source).ok())
        else {
            continue;
        };

        if let Some(hash) = reference_hash(ident, specifier) {
            references.push(ReferenceImport {
                hash: hash.to_string(),
                statement: NodeHandle::of(&statement),
            });
        }
    }

    references
}

/// The fingerprint named by a reference identifier, when its specifier
/// points at the matching generated module.
fn reference_hash<'a>(ident: &'a str, specifier: &str) -> Option<&'a str> {
    let hash = ident.strip_prefix(REFERENCE_PREFIX)?;
    let well_formed = !hash.is_empty() && hash.bytes().all(|b| b.is_ascii_hexdigit());
    let matches_module = specifier
        .strip_suffix(hash)
        .is_some_and(|rest| rest.ends_with('-'));
    (well_formed && matches_module).then_some(hash)
}

fn has_substitution(template: &Node<'_>) -> bool {
    let mut cursor = template.walk();
    let found = template
        .named_children(&mut cursor)
        .any(|child| child.kind() == "template_substitution");
    found
}

fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '\'' || c == '"')
}

// ============================================================================
// Tests
// ============================================================================
