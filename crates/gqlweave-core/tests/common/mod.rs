//! Common test utilities for integration tests.
//!
//! Provides a throwaway project directory with a `gqlweave.toml`-equivalent
//! context and a recording engine that writes artifacts without any external
//! tooling.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use gqlweave_config::GqlConfig;
use gqlweave_core::{EngineError, ExecContext, GenerationEngine, GenerationRequest};
use tempfile::TempDir;

pub const SCHEMA: &str = "type Query { viewer: User }\ntype User { id: ID! name: String }\n";

/// Temporary project rooted in its own directory.
pub struct TestProject {
    pub temp: TempDir,
    pub ctx: ExecContext,
}

impl TestProject {
    pub fn new() -> Self {
        Self::with_config(GqlConfig {
            schema: vec![PathBuf::from("schema.graphql")],
            ..Default::default()
        })
    }

    pub fn with_config(config: GqlConfig) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp.path().join("schema.graphql"), SCHEMA).unwrap();
        let ctx = ExecContext::new(temp.path(), config, "config-hash".to_string()).unwrap();
        Self { temp, ctx }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root().join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).exists()
    }

    pub fn cache_json(&self) -> serde_json::Value {
        let path = self.ctx.cache_full_dir().join(gqlweave_core::CACHE_FILE_NAME);
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }
}

/// Source with one literal call per query, importing `gql` from graphql-let.
pub fn source_with(queries: &[&str]) -> String {
    let mut source = String::from("import { gql } from 'graphql-let';\n\n");
    for (i, query) in queries.iter().enumerate() {
        source.push_str(&format!("export const q{i} = gql(`{query}`);\n"));
    }
    source
}

/// Engine that records requests and writes placeholder artifacts.
#[derive(Default)]
pub struct RecordingEngine {
    requests: Mutex<Vec<GenerationRequest>>,
    fail_on: Option<String>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any request whose literal contains `needle`.
    pub fn failing_on(needle: &str) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_on: Some(needle.to_string()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn reset(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl GenerationEngine for RecordingEngine {
    async fn generate(&self, request: &GenerationRequest) -> Result<(), EngineError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(needle) = &self.fail_on {
            if request.literal.contains(needle.as_str()) {
                return Err(EngineError::Other(format!(
                    "Cannot query field \"{needle}\" on type \"Query\""
                )));
            }
        }

        tokio::fs::write(
            &request.module_path,
            format!("export const document = `{}`;\n", request.literal),
        )
        .await?;
        tokio::fs::write(&request.declaration_path, "export declare const document: string;\n")
            .await?;
        Ok(())
    }
}
