//! Literal processing pipeline.
//!
//! Per source file, strictly in this order:
//!
//! 1. scan the file for literal calls
//! 2. fingerprint each literal against the schema hash
//! 3. consult the file's cache partition to set each literal's skip flag
//! 4. run the generation engine for literals that are not skipped
//! 5. prune cache entries (and their artifacts) whose fingerprint was not seen
//! 6. rewrite the source to reference the generated modules
//!
//! A fingerprint counts as seen when the source still contains its literal
//! call or already imports its generated module from an earlier in-place
//! rewrite.
//!
//! Independent source files run concurrently. The cache is loaded once
//! before any per-file work and persisted once after all of it, so the
//! stored cache is a consistent end-of-run snapshot. A failing source keeps
//! its previous partition and does not stop other sources. Sources without
//! literal calls skip every stage after scanning.
//!
//! ## Example
//!
//! ```ignore
//! use gqlweave_core::{CommandEngine, ExecContext, LiteralPipeline, resolve_schema_hash};
//!
//! let ctx = ExecContext::load(&cwd, &ConfigLoader::new())?;
//! let schema_hash = resolve_schema_hash(&ctx).await?;
//! let engine = CommandEngine::from_config(&ctx.config().engine);
//!
//! let report = LiteralPipeline::new(&ctx, &engine, schema_hash)
//!     .run(&["src/pages/index.tsx".to_string()])
//!     .await?;
//! ```

use std::collections::{BTreeSet, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, LiteralCache, PartialCache};
use crate::context::ExecContext;
use crate::engine::{GenerationEngine, GenerationRequest};
use crate::entrypoint::write_entrypoint;
use crate::error::{PipelineError, Result};
use crate::fingerprint::{fingerprint_normalized, normalize};
use crate::paths::{derive_paths, join_slash, logical_source_path, to_slash_str, LiteralPaths};
use crate::rewriter::{rewrite_source, ArtifactRef};
use crate::scanner::{LiteralScanner, NodeHandle, ScannedSource};

// ============================================================================
// Options
// ============================================================================

/// Whether the pipeline generates artifacts itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// Generate, prune, rewrite and persist the cache.
    #[default]
    Inline,
    /// Record, prune, rewrite and persist the cache without running the
    /// engine. The caller generates the returned records in one batch with
    /// [`LiteralPipeline::dispatch`]; until it does, recorded entries point
    /// at artifacts that do not exist yet.
    Deferred,
}

/// Where rewritten sources are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RewriteTarget {
    /// Overwrite the original source file.
    #[default]
    InPlace,
    /// Mirror source-relative paths under this directory (relative to the
    /// working directory, or absolute).
    Directory(PathBuf),
}

/// Pipeline options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub mode: GenerationMode,
    pub rewrite_target: RewriteTarget,
    /// Write the combined declaration entrypoint after generation
    pub write_entrypoint: bool,
    /// Scan, fingerprint and diff only; nothing on disk changes
    pub dry_run: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mode: GenerationMode::Inline,
            rewrite_target: RewriteTarget::InPlace,
            write_entrypoint: true,
            dry_run: false,
        }
    }
}

// ============================================================================
// Records and Reports
// ============================================================================

/// One discovered literal occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralRecord {
    /// Owning source, relative to the working directory, `/`-separated
    pub source_rel_path: String,
    /// Raw literal text
    pub literal: String,
    /// Literal text with ignored characters stripped
    pub normalized: String,
    /// Fingerprint of schema hash + normalized text
    pub hash: String,
    /// Call expression to rewrite
    pub handle: NodeHandle,
    /// Derived artifact locations
    pub paths: LiteralPaths,
    /// A cache entry already satisfies this fingerprint
    pub skip: bool,
}

/// Literal records of one source plus the fingerprints that went stale.
#[derive(Debug, Clone)]
pub struct SourcePlan {
    pub records: Vec<LiteralRecord>,
    pub stale: BTreeSet<String>,
}

/// What happened to one source file.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source_rel_path: String,
    pub records: Vec<LiteralRecord>,
    /// Number of engine invocations
    pub generated: usize,
    /// Fingerprints pruned (or, in a dry run, that would be pruned)
    pub stale: Vec<String>,
    /// Where the rewritten source was written
    pub rewritten_path: Option<PathBuf>,
}

impl SourceOutcome {
    /// Number of literals satisfied from the cache.
    pub fn skipped(&self) -> usize {
        self.records.iter().filter(|r| r.skip).count()
    }
}

/// A source file that could not be processed.
#[derive(Debug)]
pub struct SourceFailure {
    pub source_rel_path: String,
    pub error: PipelineError,
}

/// Result of one pipeline run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Sources that went through the pipeline
    pub processed: Vec<SourceOutcome>,
    /// Sources without literal calls; their cache partitions are untouched
    pub unchanged: Vec<String>,
    /// Sources that failed; their cache partitions were left untouched
    pub failures: Vec<SourceFailure>,
    /// Combined entrypoint, when written
    pub entrypoint: Option<PathBuf>,
}

impl RunReport {
    /// Whether every source succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total engine invocations.
    pub fn generated(&self) -> usize {
        self.processed.iter().map(|o| o.generated).sum()
    }

    /// Total literals satisfied from the cache.
    pub fn skipped(&self) -> usize {
        self.processed.iter().map(SourceOutcome::skipped).sum()
    }

    /// Total stale fingerprints.
    pub fn stale(&self) -> usize {
        self.processed.iter().map(|o| o.stale.len()).sum()
    }

    /// Records still waiting for generation after a deferred run.
    pub fn pending(&self) -> impl Iterator<Item = &LiteralRecord> {
        self.records().filter(|r| !r.skip)
    }

    /// All records across processed sources.
    pub fn records(&self) -> impl Iterator<Item = &LiteralRecord> {
        self.processed.iter().flat_map(|o| o.records.iter())
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Fingerprint every occurrence in `scanned` and diff against `partition`.
///
/// Stale fingerprints are the set difference between the partition's keys
/// and the fingerprints seen in this scan: those of the literal calls plus
/// those of generated modules the source already imports.
pub fn plan_source(
    ctx: &ExecContext,
    schema_hash: &str,
    source_rel_path: &str,
    scanned: &ScannedSource,
    partition: &PartialCache,
) -> SourcePlan {
    let logical = logical_source_path(ctx.types_root_dir(), source_rel_path);
    let dts_rel_dir = ctx.dts_rel_dir();

    let records: Vec<LiteralRecord> = scanned
        .occurrences
        .iter()
        .map(|occurrence| {
            let normalized = normalize(&occurrence.literal);
            let hash = fingerprint_normalized(schema_hash, &normalized);
            let paths = derive_paths(
                &logical,
                &hash,
                &dts_rel_dir,
                ctx.cache_full_dir(),
                ctx.cwd(),
            );
            let skip = partition.contains_key(&hash);
            LiteralRecord {
                source_rel_path: source_rel_path.to_string(),
                literal: occurrence.literal.clone(),
                normalized,
                hash,
                handle: occurrence.call,
                paths,
                skip,
            }
        })
        .collect();

    let seen: BTreeSet<&str> = records
        .iter()
        .map(|r| r.hash.as_str())
        .chain(scanned.referenced_hashes())
        .collect();
    let cached: BTreeSet<&str> = partition.keys().map(String::as_str).collect();
    let stale = cached
        .difference(&seen)
        .map(|hash| (*hash).to_string())
        .collect();

    SourcePlan { records, stale }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Drives scanning, generation, pruning and rewriting for a set of sources.
pub struct LiteralPipeline<'a, E: GenerationEngine + ?Sized> {
    ctx: &'a ExecContext,
    engine: &'a E,
    schema_hash: String,
    options: PipelineOptions,
}

impl<'a, E: GenerationEngine + ?Sized> LiteralPipeline<'a, E> {
    /// Create a pipeline with default options.
    pub fn new(ctx: &'a ExecContext, engine: &'a E, schema_hash: impl Into<String>) -> Self {
        Self {
            ctx,
            engine,
            schema_hash: schema_hash.into(),
            options: PipelineOptions::default(),
        }
    }

    /// Replace the pipeline options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Process the given sources (paths relative to the working directory).
    ///
    /// Returns `Err` only for failures that block every source: creating
    /// output directories, writing the entrypoint or persisting the cache.
    /// Per-source failures are collected in [`RunReport::failures`].
    pub async fn run(&self, source_rel_paths: &[String]) -> Result<RunReport> {
        let mut report = RunReport::default();
        if source_rel_paths.is_empty() {
            return Ok(report);
        }

        let start = std::time::Instant::now();
        let sources = self.scan_sources(source_rel_paths, &mut report).await;

        let mut cache = LiteralCache::load(self.ctx).await;

        if self.options.dry_run {
            let empty = PartialCache::new();
            for (rel, scanned) in sources {
                if scanned.is_empty() {
                    report.unchanged.push(rel);
                    continue;
                }
                let partition = cache.partition(&rel).unwrap_or(&empty);
                let plan = plan_source(self.ctx, &self.schema_hash, &rel, &scanned, partition);
                report.processed.push(SourceOutcome {
                    source_rel_path: rel,
                    records: plan.records,
                    generated: 0,
                    stale: plan.stale.into_iter().collect(),
                    rewritten_path: None,
                });
            }
            return Ok(report);
        }

        self.prepare().await?;

        let mut jobs: Vec<(String, ScannedSource, PartialCache)> = Vec::new();
        for (rel, scanned) in sources {
            if scanned.is_empty() {
                debug!("No literals in {}", rel);
                report.unchanged.push(rel);
                continue;
            }
            let partition = cache.take(&rel);
            jobs.push((rel, scanned, partition));
        }

        let results = join_all(
            jobs.iter()
                .map(|(rel, scanned, partition)| self.process_source(rel, scanned, partition)),
        )
        .await;

        for ((rel, _, original), result) in jobs.into_iter().zip(results) {
            match result {
                Ok((outcome, partition)) => {
                    cache.put(rel, partition);
                    report.processed.push(outcome);
                }
                Err(error) => {
                    warn!("Failed to process {}: {}", rel, error);
                    cache.put(rel.clone(), original);
                    report.failures.push(SourceFailure {
                        source_rel_path: rel,
                        error,
                    });
                }
            }
        }

        if self.options.write_entrypoint {
            report.entrypoint = Some(write_entrypoint(self.ctx, &cache).await?);
        }
        cache.unload().await?;

        if self.options.mode == GenerationMode::Deferred {
            debug!("{} literals deferred for generation", report.pending().count());
        }
        info!(
            "Processed {} sources in {:.2}s: {} generated, {} cached, {} pruned, {} failed",
            report.processed.len(),
            start.elapsed().as_secs_f64(),
            report.generated(),
            report.skipped(),
            report.stale(),
            report.failures.len()
        );

        Ok(report)
    }

    /// Run the engine for every record that is not skipped.
    ///
    /// Records sharing a source and fingerprint are generated once. Requests
    /// run concurrently; the first failure is returned after all complete.
    pub async fn dispatch<'r>(
        &self,
        records: impl IntoIterator<Item = &'r LiteralRecord>,
    ) -> Result<usize> {
        let mut seen = HashSet::new();
        let pending: Vec<&LiteralRecord> = records
            .into_iter()
            .filter(|r| !r.skip && seen.insert((r.source_rel_path.as_str(), r.hash.as_str())))
            .collect();

        let schema_paths: Vec<PathBuf> = self
            .ctx
            .config()
            .schema
            .iter()
            .map(|p| self.ctx.cwd().join(p))
            .collect();

        let results = join_all(pending.iter().map(|record| {
            let schema_paths = schema_paths.clone();
            async move {
                for path in [
                    &record.paths.module_full_path,
                    &record.paths.declaration_full_path,
                ] {
                    if let Some(parent) = path.parent() {
                        tokio::fs::create_dir_all(parent)
                            .await
                            .map_err(|e| PipelineError::io(parent, e))?;
                    }
                }

                let request = GenerationRequest {
                    source_rel_path: record.source_rel_path.clone(),
                    literal: record.literal.clone(),
                    schema_paths,
                    module_path: record.paths.module_full_path.clone(),
                    declaration_path: record.paths.declaration_full_path.clone(),
                };
                debug!("Generating {} for {}", record.hash, record.source_rel_path);
                self.engine
                    .generate(&request)
                    .await
                    .map_err(|source| PipelineError::Generation {
                        source_path: record.source_rel_path.clone(),
                        literal: record.literal.clone(),
                        source,
                    })
            }
        }))
        .await;

        results.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(pending.len())
    }

    /// Create the declaration and cache directories.
    async fn prepare(&self) -> Result<()> {
        let dts_dir = self.ctx.dts_full_dir();
        let cache_dir = self.ctx.cache_full_dir().to_path_buf();
        let results = join_all([&dts_dir, &cache_dir].into_iter().map(|dir| async move {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PipelineError::io(dir, e))
        }))
        .await;
        results.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    /// Read and scan sources. Unreadable or unparsable sources become failures.
    async fn scan_sources(
        &self,
        source_rel_paths: &[String],
        report: &mut RunReport,
    ) -> Vec<(String, ScannedSource)> {
        let mut unique = HashSet::new();
        let rels: Vec<String> = source_rel_paths
            .iter()
            .map(|rel| to_slash_str(rel))
            .filter(|rel| unique.insert(rel.clone()))
            .collect();

        let cwd = self.ctx.cwd();
        let reads = join_all(rels.into_iter().map(|rel| async move {
            let path = join_slash(cwd, &rel);
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| PipelineError::io(&path, e));
            (rel, path, text)
        }))
        .await;

        let mut scanner = LiteralScanner::new(&self.ctx.config().literals);
        let mut sources = Vec::with_capacity(reads.len());
        for (rel, path, text) in reads {
            let scanned = text.and_then(|text| {
                scanner
                    .scan(&path, text)
                    .map_err(|source| PipelineError::Scan {
                        path: rel.clone(),
                        source,
                    })
            });
            match scanned {
                Ok(scanned) => sources.push((rel, scanned)),
                Err(error) => {
                    warn!("Skipping {}: {}", rel, error);
                    report.failures.push(SourceFailure {
                        source_rel_path: rel,
                        error,
                    });
                }
            }
        }
        sources
    }

    /// Generate (inline mode only), record, prune and rewrite one source
    /// against a copy of its partition.
    async fn process_source(
        &self,
        rel: &str,
        scanned: &ScannedSource,
        partition: &PartialCache,
    ) -> Result<(SourceOutcome, PartialCache)> {
        let plan = plan_source(self.ctx, &self.schema_hash, rel, scanned, partition);
        for record in &plan.records {
            debug!(
                "{} {} in {}",
                if record.skip { "Cached" } else { "Stale" },
                record.hash,
                rel
            );
        }

        let generated = match self.options.mode {
            GenerationMode::Inline => self.dispatch(&plan.records).await?,
            GenerationMode::Deferred => 0,
        };

        // Skipped literals keep their cached entry untouched
        let mut next = partition.clone();
        for record in plan.records.iter().filter(|r| !r.skip) {
            next.insert(
                record.hash.clone(),
                CacheEntry::new(
                    record.paths.declaration_rel_path.clone(),
                    record.literal.clone(),
                ),
            );
        }

        self.prune(rel, &plan.stale, &mut next).await;

        let rewritten_path = Some(self.rewrite(rel, scanned, &plan.records).await?);

        Ok((
            SourceOutcome {
                source_rel_path: rel.to_string(),
                records: plan.records,
                generated,
                stale: plan.stale.into_iter().collect(),
                rewritten_path,
            },
            next,
        ))
    }

    /// Remove stale entries from `partition` and delete their artifacts.
    async fn prune(&self, rel: &str, stale: &BTreeSet<String>, partition: &mut PartialCache) {
        if stale.is_empty() {
            return;
        }

        let logical = logical_source_path(self.ctx.types_root_dir(), rel);
        let dts_rel_dir = self.ctx.dts_rel_dir();
        let mut targets = Vec::with_capacity(stale.len() * 2);
        for hash in stale {
            if let Some(entry) = partition.remove(hash) {
                targets.push(join_slash(self.ctx.cwd(), &entry.declaration_rel_path));
            }
            let derived = derive_paths(
                &logical,
                hash,
                &dts_rel_dir,
                self.ctx.cache_full_dir(),
                self.ctx.cwd(),
            );
            targets.push(derived.module_full_path);
            debug!("Pruned {} from {}", hash, rel);
        }

        join_all(targets.iter().map(|path| remove_if_exists(path))).await;
    }

    /// Write the rewritten source and return its path.
    async fn rewrite(
        &self,
        rel: &str,
        scanned: &ScannedSource,
        records: &[LiteralRecord],
    ) -> Result<PathBuf> {
        let target = match &self.options.rewrite_target {
            RewriteTarget::InPlace => join_slash(self.ctx.cwd(), rel),
            RewriteTarget::Directory(dir) => join_slash(&self.ctx.cwd().join(dir), rel),
        };
        let output_dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.ctx.cwd().to_path_buf());

        let artifacts: Vec<ArtifactRef<'_>> = records
            .iter()
            .map(|r| ArtifactRef {
                hash: &r.hash,
                module_full_path: &r.paths.module_full_path,
            })
            .collect();
        let text = rewrite_source(scanned, &artifacts, &output_dir).map_err(|source| {
            PipelineError::Rewrite {
                path: rel.to_string(),
                source,
            }
        })?;

        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| PipelineError::io(&output_dir, e))?;
        tokio::fs::write(&target, text)
            .await
            .map_err(|e| PipelineError::io(&target, e))?;
        debug!("Rewrote {} -> {:?}", rel, target);
        Ok(target)
    }
}

/// Delete a file; a missing file counts as deleted.
async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove stale artifact {:?}: {}", path, e),
    }
}
