use super::{read, run, workspace};

const A: &str = "export function first(): number {\n    return 1;\n}\n\nexport function second(): number {\n    return 2;\n}\n";
const B: &str = "export function third(): number {\n    return 3;\n}\n";
const C: &str = "export function fourth(): number {\n    return 4;\n}\n";

fn batch(stop_on_error: bool) -> String {
    format!(
        r#"{{
  "operations": [
    {{"operation": "remove", "selector": {{"kind": "function", "name": "first", "filePath": "src/a.ts"}}}},
    {{"operation": "rename", "selector": {{"kind": "function", "name": "missing", "filePath": "src/b.ts"}}, "newName": "other"}},
    {{"operation": "remove", "selector": {{"kind": "function", "name": "fourth", "filePath": "src/c.ts"}}}}
  ],
  "options": {{"stopOnError": {stop_on_error}}}
}}"#
    )
}

#[test]
fn failed_batch_rolls_back_everything() {
    let dir = workspace(&[("src/a.ts", A), ("src/b.ts", B), ("src/c.ts", C)]);

    let result = run(dir.path(), &batch(true));

    assert!(!result.success);
    assert_eq!(result.results.len(), 2);
    assert_eq!(result.all_operations.len(), 3);
    assert!(result.results[0].success);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .starts_with("Operation 2 (Rename missing to other in src/b.ts) failed"));

    // Operation 1 succeeded in memory but was rolled back
    assert_eq!(read(&dir, "src/a.ts"), A);
    assert_eq!(read(&dir, "src/b.ts"), B);
    assert_eq!(read(&dir, "src/c.ts"), C);
}

#[test]
fn continue_on_error_still_rolls_back() {
    let dir = workspace(&[("src/a.ts", A), ("src/b.ts", B), ("src/c.ts", C)]);

    let result = run(dir.path(), &batch(false));

    assert!(!result.success);
    assert_eq!(result.results.len(), 3);
    assert!(result.results[2].success);
    assert_eq!(read(&dir, "src/a.ts"), A);
    assert_eq!(read(&dir, "src/c.ts"), C);
}

#[test]
fn successful_batch_commits_every_operation() {
    let dir = workspace(&[("src/a.ts", A), ("src/b.ts", B)]);

    let result = run(
        dir.path(),
        r#"[
  {"operation": "rename", "selector": {"kind": "function", "name": "third", "filePath": "src/b.ts"}, "newName": "three"},
  {"operation": "move", "selector": {"kind": "function", "name": "three", "filePath": "src/b.ts"}, "targetFilePath": "src/a.ts"},
  {"operation": "remove", "selector": {"kind": "function", "name": "first", "filePath": "src/a.ts"}}
]"#,
    );

    assert!(result.success, "{:?}", result.error);
    let a = read(&dir, "src/a.ts");
    assert!(!a.contains("first"));
    assert!(a.contains("export function second()"));
    assert!(a.contains("export function three()"));
    assert_eq!(read(&dir, "src/b.ts"), "");
}
