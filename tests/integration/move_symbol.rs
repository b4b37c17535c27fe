use super::{read, run, workspace};

#[test]
fn move_creates_target_and_rewires_importers() {
    let models = "export interface Payload {\n    id: string;\n}\n\nexport interface Inner<T> {\n    value: T;\n}\n\nexport interface Wrapper<T> {\n    inner: T;\n}\n";
    let service = concat!(
        "import { Payload, Inner, Wrapper } from './models';\n",
        "import { readFileSync } from 'fs';\n",
        "\n",
        "export function unwrap(input: Wrapper<Inner<Payload>>): string {\n",
        "    return input.inner.value.id;\n",
        "}\n",
        "\n",
        "export function load(path: string): string {\n",
        "    return readFileSync(path, 'utf8');\n",
        "}\n",
    );
    let app = "import { unwrap, load } from './service';\n\nexport const id = unwrap({ inner: { value: { id: load('x') } } });\n";
    let dir = workspace(&[
        ("tsconfig.json", "{}\n"),
        ("src/models.ts", models),
        ("src/service.ts", service),
        ("src/app.ts", app),
    ]);

    let result = run(
        dir.path(),
        r#"[{"operation": "move", "selector": {"kind": "function", "name": "unwrap", "filePath": "src/service.ts"}, "targetFilePath": "src/lib/unwrap.ts"}]"#,
    );
    assert!(result.success, "{:?}", result.error);
    assert!(result.results[0].affected_files.contains("src/lib/unwrap.ts"));

    let target = read(&dir, "src/lib/unwrap.ts");
    assert!(target.contains("export function unwrap(input: Wrapper<Inner<Payload>>): string"));
    assert!(target.contains("from \"../models\""));
    for name in ["Payload", "Inner", "Wrapper"] {
        assert!(target.contains(name), "{name} missing from target import");
    }
    assert!(!target.contains("readFileSync"));

    let service = read(&dir, "src/service.ts");
    assert!(!service.contains("unwrap"));
    assert!(!service.contains("./models"));
    assert!(service.contains("import { readFileSync } from 'fs';"));
    assert!(service.contains("export function load"));

    let app = read(&dir, "src/app.ts");
    assert!(app.contains("import { load } from './service';"));
    assert!(app.contains("from './lib/unwrap'"));
    assert!(app.contains("unwrap({"));
}

#[test]
fn collision_at_target_leaves_workspace_untouched() {
    let a = "export function shared(): number {\n    return 1;\n}\n";
    let b = "export function shared(): number {\n    return 2;\n}\n";
    let dir = workspace(&[("src/a.ts", a), ("src/b.ts", b)]);

    let result = run(
        dir.path(),
        r#"[{"operation": "move", "selector": {"kind": "function", "name": "shared", "filePath": "src/a.ts"}, "targetFilePath": "src/b.ts"}]"#,
    );

    assert!(!result.success);
    assert!(result.results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("already declares 'shared'"));
    assert_eq!(read(&dir, "src/a.ts"), a);
    assert_eq!(read(&dir, "src/b.ts"), b);
}

#[test]
fn nested_member_cannot_be_moved() {
    let source = "export class Queue {\n    push(item: string) {\n        return item;\n    }\n}\n";
    let dir = workspace(&[("src/queue.ts", source)]);

    let result = run(
        dir.path(),
        r#"[{"operation": "move", "selector": {"kind": "method", "name": "push", "filePath": "src/queue.ts", "parent": {"name": "Queue", "kind": "class"}}, "targetFilePath": "src/push.ts"}]"#,
    );

    assert!(!result.success);
    assert!(result.results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("move its parent instead"));
    assert!(!dir.path().join("src/push.ts").exists());
}

#[test]
fn parameters_named_like_source_locals_stay_behind() {
    let a = "const config = { verbose: true };\n\nexport function read(config: string): string {\n    const trimmed = config.trim();\n    return trimmed;\n}\n\nexport const verbose = config.verbose;\n";
    let dir = workspace(&[("src/a.ts", a)]);

    let result = run(
        dir.path(),
        r#"[{"operation": "move", "selector": {"kind": "function", "name": "read", "filePath": "src/a.ts"}, "targetFilePath": "src/b.ts"}]"#,
    );
    assert!(result.success, "{:?}", result.error);
    assert!(result.results[0].warnings.is_empty(), "{:?}", result.results[0].warnings);

    let target = read(&dir, "src/b.ts");
    assert!(target.contains("export function read(config: string): string {"));
    assert!(!target.contains("import"));

    let source = read(&dir, "src/a.ts");
    assert!(source.starts_with("const config = { verbose: true };"));
    assert!(!source.contains("export const config"));
    assert!(!source.contains("function read"));
}
