//! Execution context shared by every pipeline stage.

use std::path::{Path, PathBuf};

use gqlweave_config::{ConfigLoader, GqlConfig, LoadedConfig};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Immutable bundle of working directory, resolved configuration and cache
/// locations, created once per invocation.
#[derive(Debug, Clone)]
pub struct ExecContext {
    cwd: PathBuf,
    config: GqlConfig,
    config_hash: String,
    cache_full_dir: PathBuf,
}

impl ExecContext {
    /// Build a context from an already loaded configuration.
    ///
    /// `cwd` must be absolute; every derived path hangs off it.
    pub fn new(cwd: impl Into<PathBuf>, config: GqlConfig, config_hash: String) -> Result<Self> {
        let cwd = cwd.into();
        if !cwd.is_absolute() {
            return Err(PipelineError::RelativeWorkingDir(cwd));
        }
        let cache_full_dir = cwd.join(&config.cache_dir);
        Ok(Self {
            cwd,
            config,
            config_hash,
            cache_full_dir,
        })
    }

    /// Load `gqlweave.toml` through `loader` and build a context for `cwd`.
    pub fn load(cwd: &Path, loader: &ConfigLoader) -> Result<Self> {
        let LoadedConfig {
            config,
            config_hash,
            path,
        } = loader.load(cwd)?;
        debug!("Loaded config from {:?} (hash {})", path, config_hash);
        Self::new(cwd, config, config_hash)
    }

    /// Absolute working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Resolved configuration.
    pub fn config(&self) -> &GqlConfig {
        &self.config
    }

    /// Fingerprint of the configuration file.
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Absolute cache directory.
    pub fn cache_full_dir(&self) -> &Path {
        &self.cache_full_dir
    }

    /// Declaration directory, relative to the working directory.
    pub fn dts_rel_dir(&self) -> PathBuf {
        self.config.dts_rel_dir()
    }

    /// Absolute declaration directory.
    pub fn dts_full_dir(&self) -> PathBuf {
        self.cwd.join(self.config.dts_rel_dir())
    }

    /// Absolute path of the combined declaration entrypoint.
    pub fn dts_entrypoint_full_path(&self) -> PathBuf {
        self.cwd.join(&self.config.gql_dts_entrypoint)
    }

    /// Fixed root segment of generated paths.
    pub fn types_root_dir(&self) -> &str {
        &self.config.types_root_dir
    }
}
