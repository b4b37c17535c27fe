//! Integration tests for the command-line interface.
//!
//! Drives the built binary against temp workspaces for apply and plan.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const UTILS: &str = "export function deprecatedHelper(): void {}\n\nexport function usefulFunction(): number {\n    return 1;\n}\n";

/// Helper to create a test workspace with an operations file
fn setup_test_workspace(operations: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("package.json"), "{\"name\": \"fixture\"}\n").unwrap();
    fs::write(dir.path().join("src/utils.ts"), UTILS).unwrap();
    fs::write(
        dir.path().join("src/app.ts"),
        "import { usefulFunction } from './utils';\n\nexport const n = usefulFunction();\n",
    )
    .unwrap();
    fs::write(dir.path().join("ops.json"), operations).unwrap();
    dir
}

fn refactor(workspace: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_symbol-refactor"))
        .args(args)
        .arg("--workspace")
        .arg(workspace)
        .env("NO_COLOR", "1")
        .env_remove("REFACTOR_WORKSPACE")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

const REMOVE_DEPRECATED: &str = r#"[{"operation": "remove", "selector": {"kind": "function", "name": "deprecatedHelper", "filePath": "src/utils.ts"}, "reason": "unused"}]"#;

#[test]
fn test_apply_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_symbol-refactor"))
        .args(["apply", "--help"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Apply a batch of refactor operations"));
    assert!(stdout.contains("--continue-on-error"));
}

#[test]
fn test_apply_basic() {
    let workspace = setup_test_workspace(REMOVE_DEPRECATED);
    let ops = workspace.path().join("ops.json");

    let output = refactor(workspace.path(), &["apply", "--operations", ops.to_str().unwrap()]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Workspace:"));
    assert!(stdout.contains("Removed deprecatedHelper from src/utils.ts"));
    assert!(stdout.contains("Committed:"));

    let utils = fs::read_to_string(workspace.path().join("src/utils.ts")).unwrap();
    assert!(!utils.contains("deprecatedHelper"));
    assert!(utils.contains("usefulFunction"));
}

#[test]
fn test_apply_dry_run() {
    let workspace = setup_test_workspace(REMOVE_DEPRECATED);
    let ops = workspace.path().join("ops.json");

    let output = refactor(
        workspace.path(),
        &["apply", "--operations", ops.to_str().unwrap(), "--dry-run", "--diff"],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("-export function deprecatedHelper(): void {}"));

    let utils = fs::read_to_string(workspace.path().join("src/utils.ts")).unwrap();
    assert_eq!(utils, UTILS);
}

#[test]
fn test_apply_rolls_back_on_failure() {
    let workspace = setup_test_workspace(
        r#"[
  {"operation": "remove", "selector": {"kind": "function", "name": "deprecatedHelper", "filePath": "src/utils.ts"}},
  {"operation": "remove", "selector": {"kind": "function", "name": "usefulFunction", "filePath": "src/utils.ts"}}
]"#,
    );
    let ops = workspace.path().join("ops.json");

    let output = refactor(workspace.path(), &["apply", "--operations", ops.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("referenced"));
    assert!(stderr.contains("Rolled back:"));

    let utils = fs::read_to_string(workspace.path().join("src/utils.ts")).unwrap();
    assert_eq!(utils, UTILS);
}

#[test]
fn test_apply_json_output() {
    let workspace = setup_test_workspace(REMOVE_DEPRECATED);
    let ops = workspace.path().join("ops.json");

    let output = refactor(
        workspace.path(),
        &["apply", "--operations", ops.to_str().unwrap(), "--json", "--dry-run"],
    );

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["results"][0]["affectedFiles"][0], "src/utils.ts");
    assert_eq!(result["allOperations"][0]["operation"], "remove");
}

#[test]
fn test_apply_rejects_paths_outside_workspace() {
    let workspace = setup_test_workspace(
        r#"[{"operation": "move", "selector": {"kind": "function", "name": "usefulFunction", "filePath": "src/utils.ts"}, "targetFilePath": "../elsewhere.ts"}]"#,
    );
    let ops = workspace.path().join("ops.json");

    let output = refactor(workspace.path(), &["apply", "--operations", ops.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not an editable path"));
}

#[test]
fn test_plan_command() {
    let workspace = setup_test_workspace(REMOVE_DEPRECATED);
    let ops = workspace.path().join("ops.json");

    let output = Command::new(env!("CARGO_BIN_EXE_symbol-refactor"))
        .args(["plan", "--operations", ops.to_str().unwrap()])
        .env("NO_COLOR", "1")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1. Remove deprecatedHelper from src/utils.ts (Reason: unused)"));
    assert!(stdout.contains("Stop on error: yes"));
}

#[test]
fn test_plan_reports_parse_errors() {
    let workspace = setup_test_workspace("please remove the helper");
    let ops = workspace.path().join("ops.json");

    let output = Command::new(env!("CARGO_BIN_EXE_symbol-refactor"))
        .args(["plan", "--operations", ops.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse refactor operations"));
}
