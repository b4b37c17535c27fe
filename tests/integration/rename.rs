use super::{read, run, workspace};

#[test]
fn rename_follows_imports_across_files() {
    let math = "export function sum(values: number[]): number {\n    return values.reduce((a, b) => a + b, 0);\n}\n";
    let stats = "import { sum } from './math';\n\nexport function mean(values: number[]): number {\n    return sum(values) / values.length;\n}\n";
    let report = "import { sum as total } from './math';\n\nexport const line = total([1, 2]);\n";
    let dir = workspace(&[
        ("src/math.ts", math),
        ("src/stats.ts", stats),
        ("src/report.ts", report),
    ]);

    let result = run(
        dir.path(),
        r#"[{"operation": "rename", "selector": {"kind": "function", "name": "sum", "filePath": "src/math.ts"}, "newName": "addAll", "reason": "clearer"}]"#,
    );
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.affected_files().len(), 3);

    assert!(read(&dir, "src/math.ts").contains("export function addAll(values: number[])"));
    assert_eq!(
        read(&dir, "src/stats.ts"),
        "import { addAll } from './math';\n\nexport function mean(values: number[]): number {\n    return addAll(values) / values.length;\n}\n"
    );
    assert_eq!(
        read(&dir, "src/report.ts"),
        "import { addAll as total } from './math';\n\nexport const line = total([1, 2]);\n"
    );
}

#[test]
fn rename_to_existing_name_is_blocked() {
    let source = "export function a(): number {\n    return 1;\n}\n\nexport function b(): number {\n    return 2;\n}\n";
    let dir = workspace(&[("src/ab.ts", source)]);

    let result = run(
        dir.path(),
        r#"[{"operation": "rename", "selector": {"kind": "function", "name": "a", "filePath": "src/ab.ts"}, "newName": "b"}]"#,
    );

    assert!(!result.success);
    assert!(result.results[0].error.as_deref().unwrap().contains("already exists"));
    assert_eq!(read(&dir, "src/ab.ts"), source);
}

#[test]
fn importer_parameter_with_new_name_blocks() {
    let loader = "export function load(): number {\n    return 1;\n}\n";
    let runner = "import { load } from './loader';\n\nexport function run(fetch: number): number {\n    return load() + fetch;\n}\n";
    let dir = workspace(&[("src/loader.ts", loader), ("src/runner.ts", runner)]);

    let result = run(
        dir.path(),
        r#"[{"operation": "rename", "selector": {"kind": "function", "name": "load", "filePath": "src/loader.ts"}, "newName": "fetch"}]"#,
    );

    assert!(!result.success);
    let error = result.results[0].error.as_deref().unwrap();
    assert!(error.contains("src/runner.ts are inside a scope that already binds 'fetch'"), "{error}");
    assert_eq!(read(&dir, "src/loader.ts"), loader);
    assert_eq!(read(&dir, "src/runner.ts"), runner);
}

#[test]
fn shadowed_importer_locals_keep_their_name() {
    let ids = "export const id = 'root';\n";
    let user = "import { id } from './ids';\n\nexport function add(key: number): string {\n    const id = key + 1;\n    return `${id}`;\n}\n\nexport const owner = id;\n";
    let dir = workspace(&[("src/ids.ts", ids), ("src/user.ts", user)]);

    let result = run(
        dir.path(),
        r#"[{"operation": "rename", "selector": {"kind": "variable", "name": "id", "filePath": "src/ids.ts"}, "newName": "rootId"}]"#,
    );

    assert!(result.success, "{:?}", result.error);
    assert_eq!(read(&dir, "src/ids.ts"), "export const rootId = 'root';\n");
    assert_eq!(
        read(&dir, "src/user.ts"),
        "import { rootId } from './ids';\n\nexport function add(key: number): string {\n    const id = key + 1;\n    return `${id}`;\n}\n\nexport const owner = rootId;\n"
    );
}
