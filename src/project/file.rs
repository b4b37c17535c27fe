//! One parsed source file and its import statements.

use crate::project::ProjectError;
use crate::ts::locator::widen_to_lines;
use crate::ts::{DeclarationLocator, FileOutline, SourceLanguage};
use std::collections::BTreeSet;
use std::ops::Range;
use tree_sitter::{Node, Tree};

/// A loaded file: text, syntax tree and the structure derived from it.
///
/// The outline and import list are recomputed on every content change, so
/// they always describe `text`. `revision` increases with every change.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub(crate) path: String,
    pub(crate) language: SourceLanguage,
    pub(crate) text: String,
    pub(crate) tree: Tree,
    pub(crate) revision: u64,
    pub(crate) on_disk: bool,
    pub(crate) outline: FileOutline,
    pub(crate) imports: Vec<ImportDecl>,
}

impl SourceFile {
    /// Parse `text` as the content of `path`.
    pub(crate) fn parse(path: &str, text: String, revision: u64) -> Result<Self, ProjectError> {
        let language = SourceLanguage::from_path(path).ok_or_else(|| {
            ProjectError::UnsupportedFile {
                path: path.to_string(),
            }
        })?;
        let tree = crate::pool::with_parser(language, |parser| parser.parse(&text))??;
        let outline = DeclarationLocator::outline(&tree, &text);
        let imports = parse_imports(&tree, &text);

        Ok(Self {
            path: path.to_string(),
            language,
            text,
            tree,
            revision,
            on_disk: false,
            outline,
            imports,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Loaded from or persisted to disk.
    pub fn on_disk(&self) -> bool {
        self.on_disk
    }

    pub fn outline(&self) -> &FileOutline {
        &self.outline
    }

    pub fn imports(&self) -> &[ImportDecl] {
        &self.imports
    }

    /// Project files this file imports from.
    pub fn resolved_targets(&self) -> BTreeSet<String> {
        self.imports
            .iter()
            .filter_map(|i| i.resolved.clone())
            .collect()
    }

    /// The import binding introducing `local` into this file.
    pub fn import_for_local(&self, local: &str) -> Option<(usize, &ImportDecl, &ImportBinding)> {
        self.imports
            .iter()
            .enumerate()
            .filter(|(_, decl)| decl.kind == ImportStatementKind::Import)
            .find_map(|(idx, decl)| {
                decl.bindings
                    .iter()
                    .find(|b| b.local == local && b.kind != BindingKind::All)
                    .map(|b| (idx, decl, b))
            })
    }

    /// Where new import statements go: after the last existing import.
    pub(crate) fn import_insertion(&self) -> ImportInsertion {
        let last = self
            .imports
            .iter()
            .filter(|i| i.kind == ImportStatementKind::Import)
            .map(|i| i.removal_span.end)
            .max();

        match last {
            Some(end) if self.text[..end].ends_with('\n') => ImportInsertion {
                at: end,
                prefix: "",
                suffix: "",
            },
            Some(end) => ImportInsertion {
                at: end,
                prefix: "\n",
                suffix: "",
            },
            None if self.text.trim().is_empty() => ImportInsertion {
                at: 0,
                prefix: "",
                suffix: "",
            },
            None => ImportInsertion {
                at: 0,
                prefix: "",
                suffix: "\n",
            },
        }
    }
}

/// Insertion point for new import statements plus the separators needed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImportInsertion {
    pub at: usize,
    pub prefix: &'static str,
    pub suffix: &'static str,
}

/// `import ... from` or `export ... from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatementKind {
    Import,
    ReExport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `import Foo from`
    Default,
    /// `import { a, b as c }` / `export { a as b } from`
    Named,
    /// `import * as ns` / `export * as ns from`
    Namespace,
    /// `export * from`
    All,
}

/// One name brought in (or passed through) by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub kind: BindingKind,
    /// Exported name in the source module (`default` / `*` for those kinds)
    pub imported: String,
    /// Name bound locally, or re-exported under for `export ... from`
    pub local: String,
    pub type_only: bool,
    /// Span of the imported name inside a named specifier
    pub name_span: Option<Range<usize>>,
}

impl ImportBinding {
    /// A named binding not yet present in any source text.
    pub fn named(imported: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            kind: BindingKind::Named,
            imported: imported.into(),
            local: local.into(),
            type_only: false,
            name_span: None,
        }
    }

    pub fn is_aliased(&self) -> bool {
        self.kind == BindingKind::Named && self.imported != self.local
    }

    pub fn same_binding(&self, other: &ImportBinding) -> bool {
        self.kind == other.kind && self.imported == other.imported && self.local == other.local
    }

    fn render_specifier(&self) -> String {
        let prefix = if self.type_only { "type " } else { "" };
        if self.is_aliased() {
            format!("{prefix}{} as {}", self.imported, self.local)
        } else {
            format!("{prefix}{}", self.imported)
        }
    }
}

/// A parsed `import`/`export ... from` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub kind: ImportStatementKind,
    /// Module specifier without quotes
    pub module: String,
    /// Span of the specifier text inside its quotes
    pub specifier_span: Range<usize>,
    pub statement_span: Range<usize>,
    pub removal_span: Range<usize>,
    /// `import type` / `export type`
    pub type_only: bool,
    pub quote: char,
    pub semicolon: bool,
    pub bindings: Vec<ImportBinding>,
    /// Project file the specifier resolves to
    pub resolved: Option<String>,
}

impl ImportDecl {
    pub fn has_namespace(&self) -> bool {
        self.bindings
            .iter()
            .any(|b| matches!(b.kind, BindingKind::Namespace | BindingKind::All))
    }

    /// Statement text for `bindings` in the style of this statement.
    pub fn render(&self, bindings: &[ImportBinding], module: &str) -> String {
        render_statement(
            self.kind,
            self.type_only,
            bindings,
            module,
            self.quote,
            self.semicolon,
        )
    }
}

/// Render an import or re-export statement.
pub fn render_statement(
    kind: ImportStatementKind,
    type_only: bool,
    bindings: &[ImportBinding],
    module: &str,
    quote: char,
    semicolon: bool,
) -> String {
    let keyword = match kind {
        ImportStatementKind::Import => "import",
        ImportStatementKind::ReExport => "export",
    };
    let type_kw = if type_only { " type" } else { "" };
    let semi = if semicolon { ";" } else { "" };
    let source = format!("{quote}{module}{quote}");

    let mut clauses: Vec<String> = Vec::new();
    if let Some(default) = bindings.iter().find(|b| b.kind == BindingKind::Default) {
        clauses.push(default.local.clone());
    }
    if let Some(ns) = bindings.iter().find(|b| b.kind == BindingKind::Namespace) {
        clauses.push(format!("* as {}", ns.local));
    } else if bindings.iter().any(|b| b.kind == BindingKind::All) {
        clauses.push("*".to_string());
    }
    let named: Vec<String> = bindings
        .iter()
        .filter(|b| b.kind == BindingKind::Named)
        .map(ImportBinding::render_specifier)
        .collect();
    if !named.is_empty() {
        clauses.push(format!("{{ {} }}", named.join(", ")));
    }

    if clauses.is_empty() {
        return format!("{keyword}{type_kw} {source}{semi}");
    }
    format!("{keyword}{type_kw} {} from {source}{semi}", clauses.join(", "))
}

/// Parse every top-level import and re-export statement.
pub(crate) fn parse_imports(tree: &Tree, source: &str) -> Vec<ImportDecl> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    let mut imports = Vec::new();

    for stmt in root.named_children(&mut cursor) {
        let kind = match stmt.kind() {
            "import_statement" => ImportStatementKind::Import,
            "export_statement" => ImportStatementKind::ReExport,
            _ => continue,
        };
        let Some(string) = stmt.child_by_field_name("source") else {
            continue;
        };
        let Some(decl) = parse_statement(stmt, string, kind, source) else {
            continue;
        };
        imports.push(decl);
    }

    imports
}

fn parse_statement(
    stmt: Node<'_>,
    string: Node<'_>,
    kind: ImportStatementKind,
    source: &str,
) -> Option<ImportDecl> {
    let raw = &source[string.byte_range()];
    let quote = raw.chars().next()?;
    if raw.len() < 2 || !matches!(quote, '"' | '\'') {
        return None;
    }
    let specifier_span = string.start_byte() + 1..string.end_byte() - 1;
    let statement_span = stmt.byte_range();

    let mut bindings = Vec::new();
    let mut cursor = stmt.walk();
    for child in stmt.children(&mut cursor) {
        match child.kind() {
            "import_clause" => parse_import_clause(child, source, &mut bindings),
            "export_clause" => parse_specifiers(child, "export_specifier", source, &mut bindings),
            "namespace_export" => {
                if let Some(name) = last_named_child(child) {
                    bindings.push(ImportBinding {
                        kind: BindingKind::Namespace,
                        imported: "*".to_string(),
                        local: text(name, source).to_string(),
                        type_only: false,
                        name_span: None,
                    });
                }
            }
            "*" if kind == ImportStatementKind::ReExport => bindings.push(ImportBinding {
                kind: BindingKind::All,
                imported: "*".to_string(),
                local: String::new(),
                type_only: false,
                name_span: None,
            }),
            _ => {}
        }
    }

    Some(ImportDecl {
        kind,
        module: source[specifier_span.clone()].to_string(),
        specifier_span,
        removal_span: widen_to_lines(&statement_span, source),
        type_only: has_token(stmt, "type"),
        quote,
        semicolon: source[statement_span.clone()].trim_end().ends_with(';'),
        statement_span,
        bindings,
        resolved: None,
    })
}

fn parse_import_clause(clause: Node<'_>, source: &str, bindings: &mut Vec<ImportBinding>) {
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => bindings.push(ImportBinding {
                kind: BindingKind::Default,
                imported: "default".to_string(),
                local: text(child, source).to_string(),
                type_only: false,
                name_span: None,
            }),
            "namespace_import" => {
                if let Some(name) = last_named_child(child) {
                    bindings.push(ImportBinding {
                        kind: BindingKind::Namespace,
                        imported: "*".to_string(),
                        local: text(name, source).to_string(),
                        type_only: false,
                        name_span: None,
                    });
                }
            }
            "named_imports" => parse_specifiers(child, "import_specifier", source, bindings),
            _ => {}
        }
    }
}

fn parse_specifiers(
    list: Node<'_>,
    specifier_kind: &str,
    source: &str,
    bindings: &mut Vec<ImportBinding>,
) {
    let mut cursor = list.walk();
    for spec in list.named_children(&mut cursor) {
        if spec.kind() != specifier_kind {
            continue;
        }
        let Some(name) = spec.child_by_field_name("name") else {
            continue;
        };
        let imported = text(name, source).to_string();
        let local = spec
            .child_by_field_name("alias")
            .map(|a| text(a, source).to_string())
            .unwrap_or_else(|| imported.clone());
        bindings.push(ImportBinding {
            kind: BindingKind::Named,
            imported,
            local,
            type_only: has_token(spec, "type"),
            name_span: Some(name.byte_range()),
        });
    }
}

fn last_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let count = node.named_child_count();
    if count == 0 {
        return None;
    }
    node.named_child(count - 1)
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| !c.is_named() && c.kind() == token);
    found
}

fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}
