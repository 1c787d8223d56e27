//! Integration tests for the gqlweave CLI
//!
//! These tests run full `gen` / `plan` / `clean` workflows in a temporary
//! project, using `sh` as the generation engine.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the gqlweave binary
#[allow(deprecated)]
fn gqlweave() -> Command {
    Command::cargo_bin("gqlweave").expect("Failed to find gqlweave binary")
}

const ENGINE: &str = r#"
[engine]
program = "sh"
args = ["-c", "cat > \"$0\" && echo 'export {}' > \"$1\"", "{module}", "{declaration}"]
"#;

const FAILING_ENGINE: &str = r#"
[engine]
program = "sh"
args = ["-c", "echo 'Cannot query field' >&2; exit 1"]
"#;

/// Create a project with a schema, one source and the given engine section
fn setup_project(engine: &str) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let root = temp.path();

    std::fs::write(root.join("schema.graphql"), "type Query { viewer: ID }\n").unwrap();
    std::fs::write(
        root.join("gqlweave.toml"),
        format!("schema = [\"schema.graphql\"]\nsources = [\"src/**/*.ts\"]\n{engine}"),
    )
    .unwrap();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(
        root.join("src/viewer.ts"),
        "import { gql } from 'graphql-let';\nexport const q = gql(`query Viewer { viewer }`);\n",
    )
    .unwrap();
    temp
}

fn run(temp: &TempDir, args: &[&str]) -> assert_cmd::assert::Assert {
    gqlweave()
        .arg("--cwd")
        .arg(temp.path())
        .arg("--quiet")
        .args(args)
        .env_remove("GQLWEAVE_CONFIG")
        .assert()
}

#[test]
fn test_gen_writes_artifacts_and_rewrites() {
    let temp = setup_project(ENGINE);

    run(&temp, &["gen", "--out-dir", "out"]).success();

    let rewritten = std::fs::read_to_string(temp.path().join("out/src/viewer.ts")).unwrap();
    assert!(rewritten.contains("import * as V"));
    assert!(!rewritten.contains("gql("));
    assert!(temp
        .path()
        .join("node_modules/.cache/gqlweave/literals.json")
        .exists());
    assert!(temp
        .path()
        .join("node_modules/@types/gqlweave/index.d.ts")
        .exists());
}

#[test]
fn test_plan_after_gen_reports_cached() {
    let temp = setup_project(ENGINE);

    run(&temp, &["plan", "--json"])
        .success()
        .stdout(predicate::str::contains("\"generate\": [\n      {"));

    run(&temp, &["gen", "--out-dir", "out"]).success();

    run(&temp, &["plan", "--json"])
        .success()
        .stdout(predicate::str::contains("\"generate\": []"))
        .stdout(predicate::str::contains("\"cached\": [\n      {"));
}

#[test]
fn test_gen_failure_exits_non_zero() {
    let temp = setup_project(FAILING_ENGINE);

    run(&temp, &["gen"])
        .failure()
        .stderr(predicate::str::contains("src/viewer.ts"))
        .stderr(predicate::str::contains("1 source failed to process"));

    // The source is left untouched
    let source = std::fs::read_to_string(temp.path().join("src/viewer.ts")).unwrap();
    assert!(source.contains("gql(`query Viewer { viewer }`)"));
}

#[test]
fn test_clean_removes_generated_files() {
    let temp = setup_project(ENGINE);
    run(&temp, &["gen", "--out-dir", "out"]).success();

    run(&temp, &["clean", "--dry-run", "--json"])
        .success()
        .stdout(predicate::str::contains("\"dry_run\": true"));
    assert!(temp.path().join("node_modules/.cache/gqlweave").exists());

    run(&temp, &["clean"]).success();
    assert!(!temp.path().join("node_modules/.cache/gqlweave").exists());
    assert!(!temp
        .path()
        .join("node_modules/@types/gqlweave/index.d.ts")
        .exists());
    assert!(temp.path().join("src/viewer.ts").exists());
}
