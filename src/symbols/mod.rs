//! Symbol selection, resolution and dependency extraction.

pub mod extractor;
pub mod resolver;
pub mod scope;
pub mod selector;

pub use extractor::{DependencyClosure, ImportedName, SymbolExtractor, TypeDeclaration};
pub use resolver::{ExternalReference, ImportRef, ResolvedSymbol, SymbolResolver, ValidationResult};
pub use selector::{ParentSelector, Selector};

use crate::project::SourceFile;
use std::collections::BTreeSet;
use std::ops::Range;
use tree_sitter::Node;

/// One place a name is used as an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub span: Range<usize>,
    /// `{ name }` object shorthand: renaming must keep the key
    pub shorthand: bool,
    /// Inside an `import`/`export ... from` statement
    pub in_import: bool,
}

/// Every identifier, type identifier and shorthand property named `name`
/// that refers to the top-level binding of that name.
///
/// Member names (`obj.name`, `ns.Name` in types, object keys) are not
/// identifiers in this sense and are never returned. Neither are uses that
/// resolve to a parameter or local declared in an enclosing scope.
pub fn identifier_occurrences(file: &SourceFile, name: &str) -> Vec<Occurrence> {
    let source = file.text();
    let mut found = Vec::new();
    let mut stack = vec![file.tree().root_node()];

    while let Some(node) = stack.pop() {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }

        let shorthand = match node.kind() {
            "identifier" | "type_identifier" => false,
            "shorthand_property_identifier" => true,
            _ => continue,
        };
        if &source[node.byte_range()] != name
            || is_qualified_member(node)
            || scope::is_shadowed(node, source)
        {
            continue;
        }
        found.push(Occurrence {
            span: node.byte_range(),
            shorthand,
            in_import: in_import_statement(node),
        });
    }

    found.sort_by_key(|o| o.span.start);
    found
}

/// Top-level names referenced by identifiers below `node`, excluding `skip`.
///
/// Parameters and locals bound inside `node` are not references.
pub(crate) fn referenced_names(node: Node<'_>, source: &str, skip: &Range<usize>) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut stack = vec![node];

    while let Some(node) = stack.pop() {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }

        if !matches!(
            node.kind(),
            "identifier" | "type_identifier" | "shorthand_property_identifier"
        ) {
            continue;
        }
        if node.byte_range() == *skip
            || is_qualified_member(node)
            || scope::is_shadowed(node, source)
        {
            continue;
        }
        names.insert(source[node.byte_range()].to_string());
    }

    names
}

/// `Name` in `ns.Name` type position.
fn is_qualified_member(node: Node<'_>) -> bool {
    node.parent().is_some_and(|parent| {
        parent.kind() == "nested_type_identifier"
            && parent
                .child_by_field_name("name")
                .is_some_and(|n| n.id() == node.id())
    })
}

fn in_import_statement(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        match n.kind() {
            "import_statement" => return true,
            "export_statement" => return n.child_by_field_name("source").is_some(),
            "program" => return false,
            _ => current = n.parent(),
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectModel;

    #[test]
    fn occurrences_skip_member_names() {
        let mut project = ProjectModel::in_memory("/p");
        let source = r#"import { User } from "./user";
import * as models from "./models";

export function load(user: User, other: models.User): User {
    const wrapped = { User };
    return user.User ?? wrapped.User;
}
"#;
        project.add_source("src/a.ts", source).unwrap();
        let file = project.file("src/a.ts").unwrap();

        let occurrences = identifier_occurrences(file, "User");
        let summary: Vec<_> = occurrences.iter().map(|o| (o.shorthand, o.in_import)).collect();
        assert_eq!(
            summary,
            vec![(false, true), (false, false), (false, false), (true, false)]
        );
    }

    #[test]
    fn referenced_names_excludes_own_name() {
        let mut project = ProjectModel::in_memory("/p");
        let source = "export function make(input: Payload): Result<Inner> { return make(input); }\n";
        project.add_source("src/a.ts", source).unwrap();
        let file = project.file("src/a.ts").unwrap();
        let decl = file.outline().top_level("make").unwrap();
        let node = decl.node(file.tree()).unwrap();

        let names = referenced_names(node, source, &decl.name_span);
        assert!(names.contains("Payload"));
        assert!(names.contains("Result"));
        assert!(names.contains("Inner"));
        assert!(!names.contains("input"));
        // recursive call still counts as a use
        assert!(names.contains("make"));
    }

    #[test]
    fn referenced_names_skips_inner_bindings() {
        let mut project = ProjectModel::in_memory("/p");
        let source = r#"const config = { verbose: true };
export function read(config: string, { depth }: Options): string {
    const local = config.trim();
    return [local, depth, shared].join(",");
}
"#;
        project.add_source("src/a.ts", source).unwrap();
        let file = project.file("src/a.ts").unwrap();
        let decl = file.outline().top_level("read").unwrap();
        let node = decl.node(file.tree()).unwrap();

        let names = referenced_names(node, source, &decl.name_span);
        let expected: BTreeSet<String> = ["Options", "shared"].map(String::from).into();
        assert_eq!(names, expected);
    }
}
