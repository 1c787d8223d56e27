//! Configuration loader.
//!
//! Reads `gqlweave.toml` from the working directory (or an explicit path),
//! validates it and fingerprints the raw file contents. The fingerprint
//! changes whenever the configuration changes, which invalidates every
//! cached literal seeded by it.

use crate::error::ConfigError;
use crate::GqlConfig;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "gqlweave.toml";

/// A validated configuration together with its fingerprint.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved configuration
    pub config: GqlConfig,

    /// Hex-encoded SHA-256 of the raw configuration file
    pub config_hash: String,

    /// Where the configuration was read from
    pub path: PathBuf,
}

/// Configuration loader.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Explicit config file path (overrides `<cwd>/gqlweave.toml`)
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader that reads `<cwd>/gqlweave.toml`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader that reads the given file instead.
    ///
    /// Relative paths are resolved against the working directory passed to `load`.
    pub fn with_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Resolve the config file path for a working directory.
    pub fn config_path(&self, cwd: &Path) -> PathBuf {
        match &self.config_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => cwd.join(path),
            None => cwd.join(CONFIG_FILE_NAME),
        }
    }

    /// Load, validate and fingerprint the configuration for `cwd`.
    pub fn load(&self, cwd: &Path) -> Result<LoadedConfig, ConfigError> {
        let path = self.config_path(cwd);

        if !path.exists() {
            return Err(ConfigError::not_found(&path));
        }

        debug!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::read_file(&path, e))?;
        let config = parse_config(&path, &content)?;

        Ok(LoadedConfig {
            config,
            config_hash: hash_config(&content),
            path,
        })
    }
}

/// Parse and validate configuration text.
fn parse_config(path: &Path, content: &str) -> Result<GqlConfig, ConfigError> {
    let config: GqlConfig =
        toml::from_str(content).map_err(|e| ConfigError::parse_toml(path, e))?;
    config.validate()?;
    Ok(config)
}

/// Fingerprint raw configuration text.
fn hash_config(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) {
        std::fs::write(dir.join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_load_missing_config() {
        let temp = TempDir::new().unwrap();
        let err = ConfigLoader::new().load(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_load_config_and_hash() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "schema = [\"schema.graphql\"]\n");

        let loaded = ConfigLoader::new().load(temp.path()).unwrap();
        assert_eq!(loaded.config.schema, vec![PathBuf::from("schema.graphql")]);
        assert_eq!(loaded.config_hash.len(), 64);
        assert_eq!(loaded.path, temp.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_hash_tracks_content() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "schema = [\"a.graphql\"]\n");
        let first = ConfigLoader::new().load(temp.path()).unwrap().config_hash;
        let again = ConfigLoader::new().load(temp.path()).unwrap().config_hash;
        assert_eq!(first, again);

        write_config(temp.path(), "schema = [\"b.graphql\"]\n");
        let changed = ConfigLoader::new().load(temp.path()).unwrap().config_hash;
        assert_ne!(first, changed);
    }

    #[test]
    fn test_invalid_toml() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "schema = [");
        let err = ConfigLoader::new().load(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn test_validation_runs_on_load() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "sources = []\n");
        let err = ConfigLoader::new().load(temp.path()).unwrap_err();
        assert!(err.to_string().contains("sources"));
    }

    #[test]
    fn test_explicit_relative_config_path() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("conf")).unwrap();
        std::fs::write(temp.path().join("conf/custom.toml"), "cache_dir = \".cache\"\n").unwrap();

        let loader = ConfigLoader::with_config_path("conf/custom.toml");
        let loaded = loader.load(temp.path()).unwrap();
        assert_eq!(loaded.config.cache_dir, PathBuf::from(".cache"));
    }
}
