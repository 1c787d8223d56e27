//! Persistent literal cache.
//!
//! The cache maps each source file (relative path) to a partition of
//! `fingerprint -> [declaration_rel_path, raw_literal]` entries and is stored
//! as a single JSON document in the cache directory:
//!
//! ```json
//! {
//!   "src/pages/index.tsx": {
//!     "3f5a...": ["node_modules/@types/gqlweave/proj-root/src/pages/index.tsx-3f5a....d.ts", "query { id }"]
//!   }
//! }
//! ```
//!
//! Lifecycle is explicit: [`LiteralCache::load`] reads (or starts empty),
//! callers mutate partitions, [`LiteralCache::unload`] persists once and
//! releases the in-memory state.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::ExecContext;
use crate::error::{PipelineError, Result};

/// File name of the persisted cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "literals.json";

/// Cached generation result for one literal.
///
/// Serialized as a two-element array `[declaration_rel_path, literal]`.
/// The literal is kept verbatim (not normalized) because the combined
/// entrypoint must reproduce the exact source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct CacheEntry {
    /// Declaration path relative to the working directory, `/`-separated
    pub declaration_rel_path: String,
    /// Raw literal text as written in the source
    pub literal: String,
}

impl CacheEntry {
    /// Create a new cache entry.
    pub fn new(declaration_rel_path: impl Into<String>, literal: impl Into<String>) -> Self {
        Self {
            declaration_rel_path: declaration_rel_path.into(),
            literal: literal.into(),
        }
    }
}

impl From<(String, String)> for CacheEntry {
    fn from((declaration_rel_path, literal): (String, String)) -> Self {
        Self {
            declaration_rel_path,
            literal,
        }
    }
}

impl From<CacheEntry> for (String, String) {
    fn from(entry: CacheEntry) -> Self {
        (entry.declaration_rel_path, entry.literal)
    }
}

/// Cache entries of one source file, keyed by fingerprint.
pub type PartialCache = BTreeMap<String, CacheEntry>;

type CacheStore = BTreeMap<String, PartialCache>;

/// In-memory literal cache for one invocation.
#[derive(Debug)]
pub struct LiteralCache {
    path: PathBuf,
    store: CacheStore,
}

impl LiteralCache {
    /// Read the persisted cache for the context's cache directory.
    ///
    /// A missing, unreadable or corrupt cache file yields an empty cache so
    /// the invocation regenerates everything instead of failing.
    pub async fn load(ctx: &ExecContext) -> Self {
        let path = ctx.cache_full_dir().join(CACHE_FILE_NAME);
        let store = read_store(&path).await;
        Self { path, store }
    }

    /// Location of the persisted cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mutable partition for a source file, created empty if absent.
    pub fn get(&mut self, source_rel_path: &str) -> &mut PartialCache {
        self.store.entry(source_rel_path.to_string()).or_default()
    }

    /// Read-only view of a partition.
    pub fn partition(&self, source_rel_path: &str) -> Option<&PartialCache> {
        self.store.get(source_rel_path)
    }

    /// Move a partition out of the cache for exclusive processing.
    ///
    /// Returns an empty partition for unknown sources. Hand it back with
    /// [`LiteralCache::put`].
    pub fn take(&mut self, source_rel_path: &str) -> PartialCache {
        self.store.remove(source_rel_path).unwrap_or_default()
    }

    /// Store a partition for a source file, replacing any previous one.
    pub fn put(&mut self, source_rel_path: impl Into<String>, partition: PartialCache) {
        self.store.insert(source_rel_path.into(), partition);
    }

    /// Iterate over all partitions in source path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PartialCache)> {
        self.store.iter()
    }

    /// Total number of cached literals.
    pub fn entry_count(&self) -> usize {
        self.store.values().map(BTreeMap::len).sum()
    }

    /// Persist the cache and release it.
    ///
    /// Empty partitions are dropped. The document is written to a sibling
    /// temporary file and renamed over the cache file in one step.
    pub async fn unload(mut self) -> Result<()> {
        self.store.retain(|_, partition| !partition.is_empty());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(&self.store)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| PipelineError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| PipelineError::io(&self.path, e))?;

        info!(
            "Saved literal cache: {} sources, {} literals",
            self.store.len(),
            self.entry_count()
        );
        Ok(())
    }
}

async fn read_store(path: &Path) -> CacheStore {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Literal cache not found at {:?}, starting empty", path);
            return CacheStore::new();
        }
        Err(e) => {
            warn!("Cannot read literal cache {:?}: {}; starting empty", path, e);
            return CacheStore::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(store) => store,
        Err(e) => {
            warn!("Corrupt literal cache {:?}: {}; starting empty", path, e);
            CacheStore::new()
        }
    }
}
