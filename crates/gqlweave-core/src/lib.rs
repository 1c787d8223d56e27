//! gqlweave Core - incremental GraphQL literal extraction
//!
//! This crate provides the literal pipeline behind the `gqlweave` CLI:
//! - Discovery of source files honoring `.gitignore` and configured globs
//! - Tree-sitter scanning of JavaScript/TypeScript sources for literal calls
//! - Schema-aware fingerprints of normalized literal text
//! - A per-source content-addressed cache persisted as one JSON document
//! - Generation of typed modules and declarations through a pluggable engine
//! - Pruning of stale artifacts and rewriting of sources to reference them

pub mod cache;
pub mod context;
pub mod engine;
pub mod entrypoint;
pub mod error;
pub mod fingerprint;
pub mod paths;
pub mod pipeline;
pub mod rewriter;
pub mod scanner;
pub mod schema;
pub mod sources;

// Re-exports for convenience
pub use cache::{CacheEntry, LiteralCache, PartialCache, CACHE_FILE_NAME};
pub use context::ExecContext;
pub use engine::{CommandEngine, EngineError, GenerationEngine, GenerationRequest};
pub use entrypoint::{render_entrypoint, write_entrypoint};
pub use error::{PipelineError, Result};
pub use fingerprint::{fingerprint, normalize};
pub use paths::{derive_paths, LiteralPaths};
pub use pipeline::{
    plan_source, GenerationMode, LiteralPipeline, LiteralRecord, PipelineOptions, RewriteTarget,
    RunReport, SourceFailure, SourceOutcome, SourcePlan,
};
pub use rewriter::{rewrite_source, ArtifactRef, RewriteError};
pub use scanner::{
    LiteralScanner, NodeHandle, ReferenceImport, ScanError, ScannedSource, SourceDialect,
};
pub use schema::resolve_schema_hash;
pub use sources::{discover_sources, normalize_source_paths};
