//! gqlweave Configuration Management
//!
//! Provides the project configuration read from `gqlweave.toml` at the
//! working directory root, together with the configuration fingerprint used
//! to seed literal hashes.
//!
//! ```toml
//! schema = ["schema.graphql"]
//! sources = ["src/**/*.ts", "src/**/*.tsx"]
//! cache_dir = "node_modules/.cache/gqlweave"
//!
//! [literals]
//! modules = ["graphql-let"]
//! functions = ["gql"]
//!
//! [engine]
//! program = "graphql-codegen-literal"
//! args = ["--schema", "{schema}", "--out", "{module}", "--dts", "{declaration}"]
//! ```

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLoader, LoadedConfig, CONFIG_FILE_NAME};

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Root configuration for gqlweave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GqlConfig {
    /// Schema files, relative to the working directory
    pub schema: Vec<PathBuf>,

    /// Glob patterns of source files to scan for literals
    pub sources: Vec<String>,

    /// Glob patterns excluded from source discovery
    pub exclude: Vec<String>,

    /// Path of the combined declaration entrypoint, relative to the working directory.
    /// Its parent directory receives every generated declaration.
    pub gql_dts_entrypoint: PathBuf,

    /// Cache directory, relative to the working directory
    pub cache_dir: PathBuf,

    /// Fixed root segment prepended to source paths when deriving generated paths
    pub types_root_dir: String,

    /// Seed literal fingerprints with the schema content instead of the config
    pub generate_resolver_types: bool,

    /// Literal call recognition
    pub literals: LiteralsConfig,

    /// External type generation command
    pub engine: EngineConfig,
}

impl Default for GqlConfig {
    fn default() -> Self {
        Self {
            schema: vec![PathBuf::from("schema.graphql")],
            sources: vec!["src/**/*.ts".to_string(), "src/**/*.tsx".to_string()],
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/dist/**".to_string(),
                "**/*.d.ts".to_string(),
            ],
            gql_dts_entrypoint: PathBuf::from("node_modules/@types/gqlweave/index.d.ts"),
            cache_dir: PathBuf::from("node_modules/.cache/gqlweave"),
            types_root_dir: "proj-root".to_string(),
            generate_resolver_types: false,
            literals: LiteralsConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl GqlConfig {
    /// Directory (relative to the working directory) that holds generated declarations.
    pub fn dts_rel_dir(&self) -> PathBuf {
        self.gql_dts_entrypoint
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema.is_empty() {
            return Err(ConfigError::invalid_value(
                "schema",
                "at least one schema file is required",
            ));
        }
        if self.sources.is_empty() {
            return Err(ConfigError::invalid_value(
                "sources",
                "at least one source pattern is required",
            ));
        }
        if self.gql_dts_entrypoint.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value(
                "gql_dts_entrypoint",
                "must not be empty",
            ));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value("cache_dir", "must not be empty"));
        }
        if !is_plain_relative(Path::new(&self.types_root_dir)) {
            return Err(ConfigError::invalid_value(
                "types_root_dir",
                "must be a relative path without '..' segments",
            ));
        }
        self.literals.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Which call expressions count as embedded query literals.
///
/// A call is recognized when its callee is bound by an import of one of
/// `functions` from one of `modules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteralsConfig {
    /// Import sources that provide the literal function
    pub modules: Vec<String>,

    /// Exported names recognized as literal functions
    pub functions: Vec<String>,
}

impl Default for LiteralsConfig {
    fn default() -> Self {
        Self {
            modules: vec!["graphql-let".to_string()],
            functions: vec!["gql".to_string()],
        }
    }
}

impl LiteralsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.modules.is_empty() {
            return Err(ConfigError::invalid_value(
                "literals.modules",
                "at least one module is required",
            ));
        }
        if self.functions.is_empty() {
            return Err(ConfigError::invalid_value(
                "literals.functions",
                "at least one function name is required",
            ));
        }
        Ok(())
    }
}

/// External type generation command.
///
/// `args` may contain the placeholders `{schema}`, `{module}`, `{declaration}`
/// and `{source}`. The literal text is written to the program's stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program to execute
    pub program: String,

    /// Arguments, with placeholders substituted per literal
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "graphql-codegen-literal".to_string(),
            args: vec![
                "--schema".to_string(),
                "{schema}".to_string(),
                "--out".to_string(),
                "{module}".to_string(),
                "--dts".to_string(),
                "{declaration}".to_string(),
            ],
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "engine.program is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_plain_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
