use super::{read, run, workspace};

const UTILS: &str = r#"/**
 * Old formatting helper.
 * @deprecated use usefulFunction
 */
export function deprecatedHelper(value: string): string {
    return value.trim();
}

export function usefulFunction(value: string): string {
    return value.toUpperCase();
}

// Answer to everything
export const CONSTANT = 42;
"#;

#[test]
fn removes_unreferenced_function() {
    let dir = workspace(&[("src/utils.ts", UTILS)]);

    let result = run(
        dir.path(),
        r#"{"operation": "remove", "selector": {"kind": "function", "name": "deprecatedHelper", "filePath": "src/utils.ts"}}"#,
    );

    assert!(result.success, "{:?}", result.error);
    let utils = read(&dir, "src/utils.ts");
    assert!(!utils.contains("deprecatedHelper"));
    assert!(!utils.contains("@deprecated"));
    assert_eq!(
        utils,
        "export function usefulFunction(value: string): string {\n    return value.toUpperCase();\n}\n\n// Answer to everything\nexport const CONSTANT = 42;\n"
    );
}

#[test]
fn referenced_interface_is_not_removed() {
    let types = "export interface TestInterface {\n    id: string;\n    name: string;\n}\n";
    let users = "import { TestInterface } from './types';\n\nexport function createUser(data: TestInterface) {\n    return { ...data };\n}\n";
    let dir = workspace(&[("src/types.ts", types), ("src/users.ts", users)]);

    let result = run(
        dir.path(),
        r#"[{"operation": "remove", "selector": {"kind": "interface", "name": "TestInterface", "filePath": "src/types.ts"}}]"#,
    );

    assert!(!result.success);
    let error = result.results[0].error.as_deref().unwrap();
    assert!(error.contains("TestInterface"));
    assert!(error.contains("referenced"));
    assert!(error.contains("src/users.ts"));
    assert_eq!(read(&dir, "src/types.ts"), types);
    assert_eq!(read(&dir, "src/users.ts"), users);
}

#[test]
fn removes_class_method() {
    let source = "export class Cache {\n    get(key: string) {\n        return key;\n    }\n\n    /** Drops everything. */\n    flush() {\n        return 0;\n    }\n}\n";
    let dir = workspace(&[("src/cache.ts", source)]);

    let result = run(
        dir.path(),
        r#"[{"operation": "remove", "selector": {"kind": "method", "name": "flush", "filePath": "src/cache.ts", "parent": {"name": "Cache"}}}]"#,
    );

    assert!(result.success, "{:?}", result.error);
    let cache = read(&dir, "src/cache.ts");
    assert!(!cache.contains("flush"));
    assert!(!cache.contains("Drops everything"));
    assert!(cache.contains("get(key: string)"));
}

#[test]
fn missing_symbol_reports_not_found() {
    let dir = workspace(&[("src/utils.ts", UTILS)]);

    let result = run(
        dir.path(),
        r#"[{"operation": "remove", "selector": {"kind": "function", "name": "nothingHere", "filePath": "src/utils.ts"}}]"#,
    );

    assert!(!result.success);
    assert!(result.results[0].error.as_deref().unwrap().contains("not found"));
    assert_eq!(read(&dir, "src/utils.ts"), UTILS);
}
