//! External type generation engine.
//!
//! The engine turns one literal plus the project schema into a typed module
//! and a declaration file at the requested destinations. The pipeline only
//! depends on the [`GenerationEngine`] trait; [`CommandEngine`] drives an
//! external program configured in `gqlweave.toml`.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use gqlweave_config::EngineConfig;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Errors reported by a generation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine program could not be started
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran and rejected the literal
    #[error("engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// I/O error while talking to the engine
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine-specific failure
    #[error("{0}")]
    Other(String),
}

/// Everything the engine needs to generate artifacts for one literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Source file the literal came from, relative to the working directory
    pub source_rel_path: String,
    /// Raw literal text
    pub literal: String,
    /// Absolute schema file paths
    pub schema_paths: Vec<PathBuf>,
    /// Absolute destination of the typed module
    pub module_path: PathBuf,
    /// Absolute destination of the declaration
    pub declaration_path: PathBuf,
}

/// Generates typed artifacts for a literal.
///
/// On success both destination files exist. Implementations must be safe to
/// call concurrently for distinct requests.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Generate artifacts for one literal.
    async fn generate(&self, request: &GenerationRequest) -> Result<(), EngineError>;
}

/// Engine backed by an external program.
///
/// Arguments may contain `{schema}` (comma-separated schema paths),
/// `{module}`, `{declaration}` and `{source}`. The literal is written to
/// the program's stdin; a non-zero exit status is a generation failure.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    /// Create an engine running `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Create an engine from the `[engine]` configuration section.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// Arguments with placeholders substituted for `request`.
    pub fn render_args(&self, request: &GenerationRequest) -> Vec<String> {
        let schema = request
            .schema_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        let module = request.module_path.display().to_string();
        let declaration = request.declaration_path.display().to_string();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{schema}", &schema)
                    .replace("{module}", &module)
                    .replace("{declaration}", &declaration)
                    .replace("{source}", &request.source_rel_path)
            })
            .collect()
    }
}

#[async_trait]
impl GenerationEngine for CommandEngine {
    async fn generate(&self, request: &GenerationRequest) -> Result<(), EngineError> {
        let args = self.render_args(request);
        debug!("Running {} {:?}", self.program, args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = async {
                stdin.write_all(request.literal.as_bytes()).await?;
                stdin.shutdown().await
            }
            .await;
            // The exit status decides for programs that never read stdin.
            match written {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request() -> GenerationRequest {
        GenerationRequest {
            source_rel_path: "src/a.ts".to_string(),
            literal: "{ id }".to_string(),
            schema_paths: vec![PathBuf::from("/p/a.graphql"), PathBuf::from("/p/b.graphql")],
            module_path: PathBuf::from("/p/.cache/a.ts-h.tsx"),
            declaration_path: PathBuf::from("/p/types/a.ts-h.d.ts"),
        }
    }

    #[test]
    fn test_render_args() {
        let engine = CommandEngine::from_config(&EngineConfig::default());
        assert_eq!(
            engine.render_args(&request()),
            vec![
                "--schema",
                "/p/a.graphql,/p/b.graphql",
                "--out",
                "/p/.cache/a.ts-h.tsx",
                "--dts",
                "/p/types/a.ts-h.d.ts",
            ]
        );

        let engine = CommandEngine::new("gen", vec!["--from={source}".to_string()]);
        assert_eq!(engine.render_args(&request()), vec!["--from=src/a.ts"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let engine = CommandEngine::new("gqlweave-engine-that-does-not-exist", vec![]);
        let result = engine.generate(&request()).await;
        assert!(matches!(result, Err(EngineError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_engine_writes_and_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut req = request();
        req.module_path = temp.path().join("a.tsx");
        req.declaration_path = temp.path().join("a.d.ts");

        let engine = CommandEngine::new(
            "sh",
            vec![
                "-c".to_string(),
                "cat > \"$0\" && echo 'export {}' > \"$1\"".to_string(),
                "{module}".to_string(),
                "{declaration}".to_string(),
            ],
        );
        engine.generate(&req).await.unwrap();
        assert_eq!(std::fs::read_to_string(&req.module_path).unwrap(), "{ id }");
        assert!(req.declaration_path.exists());

        let failing = CommandEngine::new(
            "sh",
            vec!["-c".to_string(), "echo 'Unknown field' >&2; exit 3".to_string()],
        );
        match failing.generate(&req).await {
            Err(EngineError::Failed { stderr, .. }) => assert_eq!(stderr, "Unknown field"),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
