//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `workflowscript` binary and verify exit
//! codes, stdout content, and stderr content. Source files are written to
//! temporary directories; the bundled samples are read from the workspace.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `workflowscript` binary, rooted at workspace.
fn workflowscript() -> Command {
    let mut cmd = cargo_bin_cmd!("workflowscript");
    cmd.current_dir(workspace_root());
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Write `source` to `<dir>/main.wfs` and return the path.
fn write_source(dir: &TempDir, source: &str) -> PathBuf {
    let path = dir.path().join("main.wfs");
    fs::write(&path, source).unwrap();
    path
}

// ──────────────────────────────────────────────
// 1. Usage
// ──────────────────────────────────────────────

#[test]
fn missing_file_argument_prints_usage_and_exits_1() {
    workflowscript()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_exits_0_with_description() {
    workflowscript()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Compile WorkflowScript source"));
}

#[test]
fn unknown_validator_is_rejected() {
    workflowscript()
        .args(["--disable", "noSuchValidator", "samples/hello.wfs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missingJumpTarget"));
}

// ──────────────────────────────────────────────
// 2. Successful compilation
// ──────────────────────────────────────────────

#[test]
fn compiles_to_yaml_on_stdout() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "workflow main() { a = 1 }");
    let output = workflowscript().arg(&path).assert().success().get_output().clone();
    let yaml: serde_json::Value = serde_yaml::from_slice(&output.stdout).unwrap();
    assert_eq!(
        yaml,
        serde_json::json!({"main": {"steps": [{"assign1": {"assign": [{"a": 1}]}}]}})
    );
    assert!(output.stderr.is_empty());
}

#[test]
fn compiles_to_json_on_request() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "workflow main() { a = 1 + 2 }");
    let output = workflowscript()
        .args(["--output", "json"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["main"]["steps"][0]["assign1"]["assign"][0]["a"], "${1 + 2}");
}

#[test]
fn bundled_samples_compile() {
    for sample in ["hello", "control_flow", "parallel", "retries"] {
        workflowscript()
            .arg(format!("samples/{}.wfs", sample))
            .assert()
            .success()
            .stdout(predicate::str::starts_with("main:"));
    }
}

#[test]
fn verbose_logs_to_stderr_only() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "workflow main() { a = 1 }");
    workflowscript()
        .arg("--verbose")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("main:"))
        .stderr(predicate::str::contains("tokenized source"));
}

// ──────────────────────────────────────────────
// 3. Errors
// ──────────────────────────────────────────────

#[test]
fn unreadable_file_exits_1() {
    workflowscript()
        .arg("does/not/exist.wfs")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn validation_error_text() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "workflow main() { r = nowhere(a = 1) }");
    workflowscript()
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("WorkflowValidationError"))
        .stderr(predicate::str::contains("missingJumpTarget"));
}

#[test]
fn validation_error_json() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "workflow main() { } workflow main() { }");
    let output = workflowscript()
        .args(["--error-format", "json"])
        .arg(&path)
        .assert()
        .code(1)
        .get_output()
        .clone();
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["kind"], "WorkflowValidationError");
    assert_eq!(err["issues"][0]["type"], "duplicatedSubworkflowName");
}

#[test]
fn disabled_validators_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write_source(
        &dir,
        "workflow main() { r = nowhere(a = 1) } workflow main() { }",
    );
    workflowscript()
        .args([
            "--disable",
            "missingJumpTarget,duplicatedSubworkflowName",
        ])
        .arg(&path)
        .assert()
        .success();
    workflowscript()
        .args(["--disable", "missingJumpTarget"])
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("duplicatedSubworkflowName"));
}

#[test]
fn syntax_error_json_has_position() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "workflow main() {\n  a = \n}");
    let output = workflowscript()
        .args(["--error-format", "json"])
        .arg(&path)
        .assert()
        .code(1)
        .get_output()
        .clone();
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["kind"], "ParseError");
    assert_eq!(err["line"], 3);
}

#[test]
fn post_parsing_error_text() {
    let dir = TempDir::new().unwrap();
    let path = write_source(&dir, "workflow main() { for (x in 999) { } }");
    workflowscript()
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Value in a for loop is not iterable"));
}
