//! CLI parsing tests for the gqlweave command
//!
//! Tests that verify CLI argument parsing works correctly.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the gqlweave binary
#[allow(deprecated)]
fn gqlweave() -> Command {
    Command::cargo_bin("gqlweave").expect("Failed to find gqlweave binary")
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    gqlweave()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("gen"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("clean"));
}

#[test]
fn test_version_flag() {
    gqlweave()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gqlweave"));
}

#[test]
fn test_global_options_in_help() {
    gqlweave()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--cwd"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"));
}

// ============================================================================
// Subcommand Tests
// ============================================================================

#[test]
fn test_gen_help() {
    gqlweave()
        .args(["gen", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--out-dir"))
        .stdout(predicate::str::contains("--no-entrypoint"))
        .stdout(predicate::str::contains("[PATHS]"));
}

#[test]
fn test_plan_help() {
    gqlweave()
        .args(["plan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_clean_help() {
    gqlweave()
        .args(["clean", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_unknown_command_fails() {
    gqlweave()
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_missing_subcommand_fails() {
    gqlweave().assert().failure();
}

// ============================================================================
// Configuration Errors
// ============================================================================

#[test]
fn test_missing_config_fails() {
    let temp = TempDir::new().unwrap();
    gqlweave()
        .args(["--quiet", "gen"])
        .current_dir(temp.path())
        .env_remove("GQLWEAVE_CWD")
        .env_remove("GQLWEAVE_CONFIG")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_missing_cwd_fails() {
    gqlweave()
        .args(["--cwd", "/definitely/not/a/project", "plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project directory not found"));
}
