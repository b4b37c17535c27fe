//! Declaration outline of a TypeScript file.
//!
//! Walks the top-level statements of a parsed program and records every named
//! declaration with the spans the refactoring handlers need: the name, the
//! declaration node, the whole statement (with `export`/`declare` wrappers and
//! an attached JSDoc block) and the wider span used when excising it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tree_sitter::{Node, Tree};

/// Kind of a named declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    #[serde(alias = "typeAlias", alias = "type_alias")]
    Type,
    Enum,
    #[serde(alias = "const", alias = "let", alias = "var")]
    Variable,
    Method,
    Property,
}

impl SymbolKind {
    /// Kinds that can only be addressed inside a parent container.
    pub fn is_member(self) -> bool {
        matches!(self, SymbolKind::Method | SymbolKind::Property)
    }

    /// Whether a selector of this kind addresses `decl`.
    ///
    /// A `function` selector also accepts a variable initialised with an
    /// arrow function or function expression.
    pub fn accepts(self, decl: &Declaration) -> bool {
        self == decl.kind || (self == SymbolKind::Function && decl.is_function_value)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Variable => "variable",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
        })
    }
}

/// One named declaration found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub kind: SymbolKind,
    /// Carries `export` at its declaration site
    pub exported: bool,
    pub default_export: bool,
    /// Variable initialised with an arrow function / function expression
    pub is_function_value: bool,
    /// Tree-sitter kind of the declaration node (for re-locating it)
    pub node_kind: &'static str,
    pub name_span: Range<usize>,
    pub node_span: Range<usize>,
    /// Statement including `export`/`declare` wrappers
    pub statement_span: Range<usize>,
    /// Statement plus attached JSDoc, or declarator plus separating comma
    pub span: Range<usize>,
    /// `span` widened over its own indentation and line break
    pub removal_span: Range<usize>,
    /// `const`/`let`/`var` for variables
    pub var_keyword: Option<String>,
    /// Variable declarator sharing its statement with siblings
    pub shares_statement: bool,
    /// Name of the enclosing class/interface for members
    pub parent: Option<String>,
    pub members: Vec<Declaration>,
}

impl Declaration {
    /// Re-locate the declaration node inside `tree`.
    ///
    /// Only valid against the tree the declaration was outlined from.
    pub fn node<'t>(&self, tree: &'t Tree) -> Option<Node<'t>> {
        node_at(tree.root_node(), &self.node_span, self.node_kind)
    }
}

/// `export { local as exported }` without a module source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalExport {
    pub local: String,
    pub exported: String,
    pub span: Range<usize>,
}

/// Structural outline of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutline {
    pub declarations: Vec<Declaration>,
    pub local_exports: Vec<LocalExport>,
    /// `export default <identifier>` or the name of a default-exported declaration
    pub default_export: Option<String>,
}

impl FileOutline {
    /// Find the declaration addressed by `target`.
    pub fn find(&self, target: &StructuralTarget) -> Option<&Declaration> {
        match target {
            StructuralTarget::Declaration { kind, name } => self
                .declarations
                .iter()
                .find(|d| &d.name == name && kind.accepts(d)),
            StructuralTarget::Member {
                parent,
                parent_kind,
                kind,
                name,
            } => self
                .declarations
                .iter()
                .filter(|d| &d.name == parent)
                .filter(|d| parent_kind.is_none_or(|k| k.accepts(d)))
                .flat_map(|d| d.members.iter())
                .find(|m| &m.name == name && kind.accepts(m)),
        }
    }

    /// Top-level declaration with `name`, regardless of kind.
    pub fn top_level(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Names under which `name` is visible to importers.
    pub fn public_names(&self, decl: &Declaration) -> Vec<String> {
        let mut names = Vec::new();
        if decl.exported && !decl.default_export {
            names.push(decl.name.clone());
        }
        for export in self.local_exports.iter().filter(|e| e.local == decl.name) {
            if !names.contains(&export.exported) {
                names.push(export.exported.clone());
            }
        }
        names
    }

    /// Whether `decl` is the file's default export.
    pub fn is_default_export(&self, decl: &Declaration) -> bool {
        decl.default_export || self.default_export.as_deref() == Some(decl.name.as_str())
    }
}

/// High-level structural target for locating TypeScript declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralTarget {
    /// A top-level declaration
    Declaration { kind: SymbolKind, name: String },

    /// A member of a top-level class or interface
    Member {
        parent: String,
        parent_kind: Option<SymbolKind>,
        kind: SymbolKind,
        name: String,
    },
}

/// Builds [`FileOutline`]s from parsed trees.
pub struct DeclarationLocator;

impl DeclarationLocator {
    /// Outline every top-level declaration in `tree`.
    pub fn outline(tree: &Tree, source: &str) -> FileOutline {
        let mut outline = FileOutline::default();
        let root = tree.root_node();
        let mut cursor = root.walk();

        for stmt in root.named_children(&mut cursor) {
            match stmt.kind() {
                "export_statement" => outline_export(stmt, source, &mut outline),
                "ambient_declaration" => {
                    if let Some(inner) = first_declaration_child(stmt) {
                        collect(inner, stmt, false, false, source, &mut outline.declarations);
                    }
                }
                _ => collect(stmt, stmt, false, false, source, &mut outline.declarations),
            }
        }

        outline
    }
}

fn outline_export(stmt: Node<'_>, source: &str, outline: &mut FileOutline) {
    let is_default = has_token(stmt, "default");

    if let Some(decl) = stmt.child_by_field_name("declaration") {
        let decl = if decl.kind() == "ambient_declaration" {
            match first_declaration_child(decl) {
                Some(inner) => inner,
                None => return,
            }
        } else {
            decl
        };
        let before = outline.declarations.len();
        collect(decl, stmt, true, is_default, source, &mut outline.declarations);
        if is_default {
            if let Some(d) = outline.declarations.get(before) {
                outline.default_export = Some(d.name.clone());
            }
        }
        return;
    }

    // Re-exports (`export ... from`) belong to the import model, not the outline
    if stmt.child_by_field_name("source").is_some() {
        return;
    }

    if is_default {
        if let Some(value) = stmt.child_by_field_name("value") {
            if value.kind() == "identifier" {
                outline.default_export = Some(text(value, source).to_string());
            }
        }
        return;
    }

    let mut cursor = stmt.walk();
    for clause in stmt.named_children(&mut cursor) {
        if clause.kind() != "export_clause" {
            continue;
        }
        let mut inner = clause.walk();
        for spec in clause.named_children(&mut inner) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let Some(name) = spec.child_by_field_name("name") else {
                continue;
            };
            let local = text(name, source).to_string();
            let exported = spec
                .child_by_field_name("alias")
                .map(|a| text(a, source).to_string())
                .unwrap_or_else(|| local.clone());
            outline.local_exports.push(LocalExport {
                local,
                exported,
                span: spec.byte_range(),
            });
        }
    }
}

fn collect(
    node: Node<'_>,
    statement: Node<'_>,
    exported: bool,
    default_export: bool,
    source: &str,
    out: &mut Vec<Declaration>,
) {
    let kind = match node.kind() {
        "function_declaration" | "generator_function_declaration" => SymbolKind::Function,
        "class_declaration" | "abstract_class_declaration" => SymbolKind::Class,
        "interface_declaration" => SymbolKind::Interface,
        "type_alias_declaration" => SymbolKind::Type,
        "enum_declaration" => SymbolKind::Enum,
        "lexical_declaration" | "variable_declaration" => {
            collect_variables(node, statement, exported, source, out);
            return;
        }
        _ => return,
    };

    let Some(name) = node.child_by_field_name("name") else {
        return;
    };

    let span = with_leading_trivia(statement, source);
    let removal_span = widen_to_lines(&span, source);
    let members = match kind {
        SymbolKind::Class | SymbolKind::Interface => node
            .child_by_field_name("body")
            .map(|body| collect_members(body, text(name, source), source))
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    out.push(Declaration {
        name: text(name, source).to_string(),
        kind,
        exported,
        default_export,
        is_function_value: false,
        node_kind: node.kind(),
        name_span: name.byte_range(),
        node_span: node.byte_range(),
        statement_span: statement.byte_range(),
        span,
        removal_span,
        var_keyword: None,
        shares_statement: false,
        parent: None,
        members,
    });
}

fn collect_variables(
    node: Node<'_>,
    statement: Node<'_>,
    exported: bool,
    source: &str,
    out: &mut Vec<Declaration>,
) {
    let keyword = node
        .child(0)
        .map(|k| text(k, source).to_string())
        .filter(|k| matches!(k.as_str(), "const" | "let" | "var"));

    let mut cursor = node.walk();
    let declarators: Vec<Node<'_>> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "variable_declarator")
        .collect();
    let shares_statement = declarators.len() > 1;

    for (idx, declarator) in declarators.iter().enumerate() {
        let Some(name) = declarator.child_by_field_name("name") else {
            continue;
        };
        // Destructuring patterns do not declare a single addressable symbol
        if name.kind() != "identifier" {
            continue;
        }

        let (span, removal_span) = if shares_statement {
            let span = if idx + 1 < declarators.len() {
                declarator.start_byte()..declarators[idx + 1].start_byte()
            } else {
                declarators[idx - 1].end_byte()..declarator.end_byte()
            };
            (span.clone(), span)
        } else {
            let span = with_leading_trivia(statement, source);
            let removal = widen_to_lines(&span, source);
            (span, removal)
        };

        let is_function_value = declarator
            .child_by_field_name("value")
            .is_some_and(|v| {
                matches!(
                    v.kind(),
                    "arrow_function" | "function_expression" | "function" | "generator_function"
                )
            });

        out.push(Declaration {
            name: text(name, source).to_string(),
            kind: SymbolKind::Variable,
            exported,
            default_export: false,
            is_function_value,
            node_kind: declarator.kind(),
            name_span: name.byte_range(),
            node_span: declarator.byte_range(),
            statement_span: statement.byte_range(),
            span,
            removal_span,
            var_keyword: keyword.clone(),
            shares_statement,
            parent: None,
            members: Vec::new(),
        });
    }
}

fn collect_members(body: Node<'_>, parent: &str, source: &str) -> Vec<Declaration> {
    let mut members = Vec::new();
    let mut cursor = body.walk();

    for member in body.named_children(&mut cursor) {
        let kind = match member.kind() {
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                SymbolKind::Method
            }
            "public_field_definition" | "property_signature" => SymbolKind::Property,
            _ => continue,
        };
        let Some(name) = member.child_by_field_name("name") else {
            continue;
        };
        if !matches!(name.kind(), "property_identifier" | "private_property_identifier") {
            continue;
        }

        let mut start = with_leading_trivia(member, source).start;
        let mut prev = member.prev_sibling();
        while let Some(p) = prev {
            if p.kind() != "decorator" {
                break;
            }
            start = with_leading_trivia(p, source).start;
            prev = p.prev_sibling();
        }
        let mut end = member.end_byte();
        if let Some(next) = member.next_sibling() {
            if !next.is_named() && matches!(next.kind(), ";" | ",") {
                end = next.end_byte();
            }
        }

        let span = start..end;
        let removal_span = widen_to_lines(&span, source);
        members.push(Declaration {
            name: text(name, source).to_string(),
            kind,
            exported: false,
            default_export: false,
            is_function_value: false,
            node_kind: member.kind(),
            name_span: name.byte_range(),
            node_span: member.byte_range(),
            statement_span: member.byte_range(),
            span,
            removal_span,
            var_keyword: None,
            shares_statement: false,
            parent: Some(parent.to_string()),
            members: Vec::new(),
        });
    }

    members
}

fn first_declaration_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| {
        matches!(
            c.kind(),
            "function_declaration"
                | "generator_function_declaration"
                | "function_signature"
                | "class_declaration"
                | "abstract_class_declaration"
                | "interface_declaration"
                | "type_alias_declaration"
                | "enum_declaration"
                | "lexical_declaration"
                | "variable_declaration"
        )
    });
    found
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| !c.is_named() && c.kind() == token);
    found
}

fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// Span of `node` extended backwards over an attached `/** ... */` block.
///
/// A doc block is attached when only whitespace with at most one line break
/// separates it from the node.
fn with_leading_trivia(node: Node<'_>, source: &str) -> Range<usize> {
    let range = node.byte_range();
    let Some(prev) = node.prev_sibling() else {
        return range;
    };
    if prev.kind() != "comment" || !text(prev, source).starts_with("/**") {
        return range;
    }
    let gap = &source[prev.end_byte()..range.start];
    if gap.chars().all(char::is_whitespace) && gap.matches('\n').count() <= 1 {
        prev.start_byte()..range.end
    } else {
        range
    }
}

/// Widen `span` over its own indentation and trailing line break.
///
/// Only applies when the span starts its line; otherwise the span is returned
/// unchanged so neighbouring code on the same line keeps its layout.
pub(crate) fn widen_to_lines(span: &Range<usize>, source: &str) -> Range<usize> {
    let line_start = source[..span.start].rfind('\n').map_or(0, |i| i + 1);
    let indent = &source[line_start..span.start];
    if !indent.chars().all(|c| c == ' ' || c == '\t') {
        return span.clone();
    }

    let rest = &source[span.end..];
    let end = match rest.find('\n') {
        Some(i) if rest[..i].chars().all(|c| c == ' ' || c == '\t' || c == '\r') => {
            span.end + i + 1
        }
        None if rest.chars().all(|c| c == ' ' || c == '\t' || c == '\r') => source.len(),
        _ => span.end,
    };
    line_start..end
}

/// Smallest node covering `span` whose kind is `kind`.
pub(crate) fn node_at<'t>(root: Node<'t>, span: &Range<usize>, kind: &str) -> Option<Node<'t>> {
    let mut node = root.descendant_for_byte_range(span.start, span.end)?;
    loop {
        if node.kind() == kind && node.byte_range() == *span {
            return Some(node);
        }
        if node.start_byte() < span.start || node.end_byte() > span.end {
            return None;
        }
        node = node.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::parser::TypeScriptParser;

    fn outline(source: &str) -> (Tree, FileOutline) {
        let mut parser = TypeScriptParser::new().unwrap();
        let tree = parser.parse(source).unwrap();
        let outline = DeclarationLocator::outline(&tree, source);
        (tree, outline)
    }

    fn target(kind: SymbolKind, name: &str) -> StructuralTarget {
        StructuralTarget::Declaration {
            kind,
            name: name.to_string(),
        }
    }

    #[test]
    fn outline_top_level_kinds() {
        let source = r#"
export function testFunction() {
    return "test";
}

export interface TestInterface {
    id: number;
}

type Alias = string | number;

enum Color { Red, Green }

export class TestClass {
    private value: string;

    getValue(): string {
        return this.value;
    }
}

const local = 1;
"#;
        let (_, outline) = outline(source);
        let names: Vec<_> = outline
            .declarations
            .iter()
            .map(|d| (d.name.as_str(), d.kind, d.exported))
            .collect();
        assert_eq!(
            names,
            vec![
                ("testFunction", SymbolKind::Function, true),
                ("TestInterface", SymbolKind::Interface, true),
                ("Alias", SymbolKind::Type, false),
                ("Color", SymbolKind::Enum, false),
                ("TestClass", SymbolKind::Class, true),
                ("local", SymbolKind::Variable, false),
            ]
        );

        let class = outline.find(&target(SymbolKind::Class, "TestClass")).unwrap();
        let members: Vec<_> = class.members.iter().map(|m| (m.name.as_str(), m.kind)).collect();
        assert_eq!(
            members,
            vec![("value", SymbolKind::Property), ("getValue", SymbolKind::Method)]
        );
    }

    #[test]
    fn span_covers_export_and_doc_comment() {
        let source = "// unrelated\n\n/** Adds. */\nexport function add(a: number) {\n  return a;\n}\n";
        let (_, outline) = outline(source);
        let add = outline.find(&target(SymbolKind::Function, "add")).unwrap();

        assert!(source[add.span.clone()].starts_with("/** Adds. */"));
        assert!(source[add.statement_span.clone()].starts_with("export function add"));
        assert_eq!(&source[add.name_span.clone()], "add");
        assert_eq!(&source[add.removal_span.clone()], &source[14..]);
    }

    #[test]
    fn removal_span_keeps_neighbouring_comment() {
        let source = "export function a() {}\n\n// keep me\nexport const B = 42;\n";
        let (_, outline) = outline(source);
        let a = outline.find(&target(SymbolKind::Function, "a")).unwrap();
        let mut after = source.to_string();
        after.replace_range(a.removal_span.clone(), "");
        assert_eq!(after, "\n// keep me\nexport const B = 42;\n");
    }

    #[test]
    fn shared_variable_statement_spans() {
        let source = "export const a = 1, b = 2, c = 3;\n";
        let (_, outline) = outline(source);
        let a = outline.find(&target(SymbolKind::Variable, "a")).unwrap();
        let c = outline.find(&target(SymbolKind::Variable, "c")).unwrap();
        assert!(a.shares_statement);
        assert_eq!(&source[a.span.clone()], "a = 1, ");
        assert_eq!(&source[c.span.clone()], ", c = 3");
        assert_eq!(a.var_keyword.as_deref(), Some("const"));
        assert!(a.exported);
    }

    #[test]
    fn arrow_function_variable_matches_function_selector() {
        let source = "export const handler = (x: number) => x * 2;\n";
        let (_, outline) = outline(source);
        let found = outline.find(&target(SymbolKind::Function, "handler")).unwrap();
        assert_eq!(found.kind, SymbolKind::Variable);
        assert!(found.is_function_value);
    }

    #[test]
    fn member_lookup_requires_parent() {
        let source = "export class Container {\n  helper() { return 1; }\n  keeper() { return 2; }\n}\n";
        let (_, outline) = outline(source);
        let member = outline
            .find(&StructuralTarget::Member {
                parent: "Container".into(),
                parent_kind: Some(SymbolKind::Class),
                kind: SymbolKind::Method,
                name: "helper".into(),
            })
            .unwrap();
        assert_eq!(member.parent.as_deref(), Some("Container"));
        assert_eq!(&source[member.removal_span.clone()], "  helper() { return 1; }\n");

        assert!(outline.find(&target(SymbolKind::Method, "helper")).is_none());
    }

    #[test]
    fn local_exports_and_default() {
        let source = "function a() {}\nfunction b() {}\nexport { a, b as renamed };\nexport default a;\n";
        let (_, outline) = outline(source);
        let a = outline.top_level("a").unwrap();
        let b = outline.top_level("b").unwrap();
        assert!(!a.exported);
        assert_eq!(outline.public_names(b), vec!["renamed".to_string()]);
        assert!(outline.is_default_export(a));
    }

    #[test]
    fn declaration_node_relocates() {
        let source = "let x;\nexport function f() {}\n";
        let (tree, outline) = outline(source);
        let x = outline.top_level("x").unwrap();
        assert_eq!(x.node(&tree).unwrap().kind(), "variable_declarator");
        let f = outline.top_level("f").unwrap();
        assert_eq!(f.node(&tree).unwrap().kind(), "function_declaration");
    }
}
