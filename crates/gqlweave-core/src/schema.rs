//! Schema fingerprint provider.
//!
//! The seed mixed into every literal fingerprint is the configuration hash,
//! or, when resolver type generation is enabled, a hash of the schema files
//! themselves. Any change to the seed invalidates every cached literal.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::context::ExecContext;
use crate::error::{PipelineError, Result};

/// Resolve the seed for literal fingerprints.
pub async fn resolve_schema_hash(ctx: &ExecContext) -> Result<String> {
    if ctx.config().generate_resolver_types {
        schema_content_hash(ctx).await
    } else {
        Ok(ctx.config_hash().to_string())
    }
}

/// Hash the configured schema files in configuration order.
///
/// Each file contributes its relative path and contents, so renaming a
/// schema file also changes the hash.
pub async fn schema_content_hash(ctx: &ExecContext) -> Result<String> {
    let mut hasher = Sha256::new();
    for rel_path in &ctx.config().schema {
        let full_path = ctx.cwd().join(rel_path);
        let content = tokio::fs::read(&full_path)
            .await
            .map_err(|e| PipelineError::io(&full_path, e))?;
        hasher.update(rel_path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(&content);
        hasher.update([0u8]);
    }
    let hash = format!("{:x}", hasher.finalize());
    debug!("Schema content hash: {}", hash);
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlweave_config::GqlConfig;
    use tempfile::TempDir;

    fn context(temp: &TempDir, resolver_types: bool) -> ExecContext {
        let config = GqlConfig {
            generate_resolver_types: resolver_types,
            ..Default::default()
        };
        ExecContext::new(temp.path(), config, "config-hash".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_config_hash_is_default_seed() {
        let temp = TempDir::new().unwrap();
        let hash = resolve_schema_hash(&context(&temp, false)).await.unwrap();
        assert_eq!(hash, "config-hash");
    }

    #[tokio::test]
    async fn test_schema_content_seed() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("schema.graphql"), "type Query { a: Int }").unwrap();
        let ctx = context(&temp, true);

        let first = resolve_schema_hash(&ctx).await.unwrap();
        assert_ne!(first, "config-hash");
        assert_eq!(first, resolve_schema_hash(&ctx).await.unwrap());

        std::fs::write(temp.path().join("schema.graphql"), "type Query { b: Int }").unwrap();
        assert_ne!(first, resolve_schema_hash(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_schema_is_error() {
        let temp = TempDir::new().unwrap();
        let result = resolve_schema_hash(&context(&temp, true)).await;
        assert!(matches!(result, Err(PipelineError::Io { .. })));
    }
}
