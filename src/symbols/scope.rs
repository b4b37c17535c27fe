//! Lexical scopes below the top level of a file.
//!
//! Only what shadowing needs is modelled: the names a function, block, loop,
//! catch clause or generic declaration binds for the code inside it. Values
//! and types live apart, so a parameter named `User` does not hide the
//! interface `User` in a type annotation.

use crate::project::SourceFile;
use std::collections::BTreeSet;
use std::ops::Range;
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Value,
    Type,
}

impl Namespace {
    /// Where an identifier node looks its name up.
    pub fn of(node: Node<'_>) -> Self {
        if node.kind() == "type_identifier" {
            Namespace::Type
        } else {
            Namespace::Value
        }
    }
}

/// Names one scope binds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pub values: BTreeSet<String>,
    pub types: BTreeSet<String>,
}

impl Bindings {
    pub fn binds(&self, name: &str, namespace: Namespace) -> bool {
        match namespace {
            Namespace::Value => self.values.contains(name),
            Namespace::Type => self.types.contains(name),
        }
    }
}

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

fn is_function(node: Node<'_>) -> bool {
    FUNCTION_KINDS.contains(&node.kind())
}

fn is_scope(node: Node<'_>) -> bool {
    is_function(node)
        || matches!(
            node.kind(),
            "statement_block"
                | "for_statement"
                | "for_in_statement"
                | "catch_clause"
                | "class_declaration"
                | "abstract_class_declaration"
                | "class"
                | "interface_declaration"
                | "type_alias_declaration"
        )
}

/// Names `scope` binds for the code it encloses.
///
/// A function scope also holds every `var` declared anywhere in its body,
/// nested functions excluded.
pub fn bindings(scope: Node<'_>, source: &str) -> Bindings {
    let mut out = Bindings::default();

    if let Some(params) = scope.child_by_field_name("type_parameters") {
        for param in params.named_children(&mut params.walk()) {
            if let Some(name) = param.child_by_field_name("name") {
                out.types.insert(source[name.byte_range()].to_string());
            }
        }
    }

    if is_function(scope) {
        // A named function expression sees its own name
        if matches!(scope.kind(), "function_expression" | "function" | "generator_function") {
            if let Some(name) = scope.child_by_field_name("name") {
                out.values.insert(source[name.byte_range()].to_string());
            }
        }
        for field in ["parameters", "parameter"] {
            if let Some(params) = scope.child_by_field_name(field) {
                pattern_names(params, source, &mut out.values);
            }
        }
        if let Some(body) = scope.child_by_field_name("body") {
            hoisted_vars(body, source, &mut out.values);
        }
        return out;
    }

    match scope.kind() {
        "statement_block" => {
            for statement in scope.named_children(&mut scope.walk()) {
                declared_by(statement, source, &mut out);
            }
        }
        "for_statement" => {
            if let Some(init) = scope.child_by_field_name("initializer") {
                declared_by(init, source, &mut out);
            }
        }
        "for_in_statement" => {
            // `for (x of xs)` assigns; only `for (const x ...)` declares
            if scope.child_by_field_name("kind").is_some() {
                if let Some(left) = scope.child_by_field_name("left") {
                    pattern_names(left, source, &mut out.values);
                }
            }
        }
        "catch_clause" => {
            if let Some(param) = scope.child_by_field_name("parameter") {
                pattern_names(param, source, &mut out.values);
            }
        }
        _ => {}
    }
    out
}

/// Bindings a statement introduces into the block holding it.
fn declared_by(statement: Node<'_>, source: &str, out: &mut Bindings) {
    let name = || {
        statement
            .child_by_field_name("name")
            .map(|n| source[n.byte_range()].to_string())
    };
    match statement.kind() {
        "lexical_declaration" | "variable_declaration" => {
            for declarator in statement.named_children(&mut statement.walk()) {
                if let Some(pattern) = declarator.child_by_field_name("name") {
                    pattern_names(pattern, source, &mut out.values);
                }
            }
        }
        "function_declaration" | "generator_function_declaration" => {
            out.values.extend(name());
        }
        "class_declaration" | "abstract_class_declaration" | "enum_declaration" => {
            if let Some(name) = name() {
                out.types.insert(name.clone());
                out.values.insert(name);
            }
        }
        "interface_declaration" | "type_alias_declaration" => {
            out.types.extend(name());
        }
        _ => {}
    }
}

/// Identifiers a binding pattern declares, defaults and type annotations
/// excluded.
fn pattern_names(node: Node<'_>, source: &str, out: &mut BTreeSet<String>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            out.insert(source[node.byte_range()].to_string());
        }
        "formal_parameters" | "object_pattern" | "array_pattern" | "rest_pattern" => {
            for child in node.named_children(&mut node.walk()) {
                pattern_names(child, source, out);
            }
        }
        "required_parameter" | "optional_parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                pattern_names(pattern, source, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                pattern_names(value, source, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                pattern_names(left, source, out);
            }
        }
        _ => {}
    }
}

fn hoisted_vars(body: Node<'_>, source: &str, out: &mut BTreeSet<String>) {
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "variable_declaration" {
            for declarator in node.named_children(&mut node.walk()) {
                if let Some(pattern) = declarator.child_by_field_name("name") {
                    pattern_names(pattern, source, out);
                }
            }
        }
        for child in node.named_children(&mut node.walk()) {
            if !is_function(child) {
                stack.push(child);
            }
        }
    }
}

/// Innermost scope enclosing `node` that binds `name` in `namespace`.
///
/// `None` means the name resolves at the top level of the file (or to a
/// global when nothing there declares it).
pub fn binding_scope<'t>(
    node: Node<'t>,
    name: &str,
    namespace: Namespace,
    source: &str,
) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(scope) = current {
        if is_scope(scope) && bindings(scope, source).binds(name, namespace) {
            return Some(scope);
        }
        current = scope.parent();
    }
    None
}

/// Whether the identifier `node` names something bound below the top level.
pub fn is_shadowed(node: Node<'_>, source: &str) -> bool {
    let name = &source[node.byte_range()];
    binding_scope(node, name, Namespace::of(node), source).is_some()
}

/// Whether `name` would be captured by an inner binding if written over the
/// identifier at `span`.
pub fn bound_at(file: &SourceFile, span: &Range<usize>, name: &str) -> bool {
    let Some(node) = file
        .tree()
        .root_node()
        .descendant_for_byte_range(span.start, span.end)
    else {
        return false;
    };
    binding_scope(node, name, Namespace::of(node), file.text()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectModel;
    use crate::symbols::identifier_occurrences;

    fn project(source: &str) -> ProjectModel {
        let mut project = ProjectModel::in_memory("/p");
        project.add_source("src/a.ts", source).unwrap();
        project
    }

    #[test]
    fn parameters_and_locals_shadow() {
        let source = r#"export const id = "root";

export function add(key: number) {
    const id = 1;
    return id + key;
}

export function tag({ id }: { id: string }, ...rest: string[]) {
    return id;
}

export function show() {
    try {
        return id;
    } catch (id) {
        return id;
    }
}
"#;
        let project = project(source);
        let file = project.file("src/a.ts").unwrap();

        let lines: Vec<usize> = identifier_occurrences(file, "id")
            .iter()
            .map(|o| source[..o.span.start].lines().count())
            .collect();
        // top-level declaration and the use inside `try`
        assert_eq!(lines, vec![1, 14]);
    }

    #[test]
    fn var_hoists_to_function() {
        let source = "export let n = 0;\nexport function f() {\n    if (true) { var n = 1; }\n    return n;\n}\n";
        let project = project(source);
        let file = project.file("src/a.ts").unwrap();
        assert_eq!(identifier_occurrences(file, "n").len(), 1);
    }

    #[test]
    fn values_do_not_shadow_types() {
        let source = "interface User { id: string }\nexport function f<T>(User: T): User { return User as unknown as User; }\n";
        let project = project(source);
        let file = project.file("src/a.ts").unwrap();

        // declaration, return type, cast target
        assert_eq!(identifier_occurrences(file, "User").len(), 3);
        assert!(identifier_occurrences(file, "T").is_empty());
    }

    #[test]
    fn bound_at_sees_enclosing_parameters() {
        let source = "export const id = 1;\nexport function tag(key: string) { return id + key; }\n";
        let project = project(source);
        let file = project.file("src/a.ts").unwrap();

        let uses = identifier_occurrences(file, "id");
        assert_eq!(uses.len(), 2);
        assert!(!bound_at(file, &uses[0].span, "key"));
        assert!(bound_at(file, &uses[1].span, "key"));
        assert!(!bound_at(file, &uses[1].span, "other"));
    }
}
