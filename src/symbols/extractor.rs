//! Dependency closure of a declaration.
//!
//! The closure is what a declaration needs to stand alone in another file:
//! the imports its body uses, the local interfaces and type aliases it
//! mentions (transitively), and the other local values it calls.

use crate::project::{BindingKind, ProjectError, ProjectModel, SourceFile};
use crate::symbols::{referenced_names, ResolvedSymbol};
use crate::ts::SymbolKind;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// An imported name used by the extracted declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    /// Module specifier as written in the owning file
    pub module: String,
    /// Name exported by that module (`default`/`*` for those forms)
    pub imported: String,
    pub kind: BindingKind,
    pub type_only: bool,
    /// Project file the specifier resolves to
    pub resolved: Option<String>,
}

/// A local type declaration the extracted declaration depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyClosure {
    /// Required type declarations followed by the declaration itself
    pub text: String,
    /// The declaration alone
    pub declaration_text: String,
    /// Local name -> where it is imported from
    pub imports: BTreeMap<String, ImportedName>,
    /// Local interfaces and type aliases, closed under reference
    pub types: BTreeSet<String>,
    /// Texts of `types`, in source order
    pub type_declarations: Vec<TypeDeclaration>,
    /// Other local values (functions, variables, classes, enums) referenced
    pub locals: BTreeSet<String>,
}

pub struct SymbolExtractor<'p> {
    project: &'p ProjectModel,
}

impl<'p> SymbolExtractor<'p> {
    pub fn new(project: &'p ProjectModel) -> Self {
        Self { project }
    }

    /// Compute the dependency closure of `symbol`.
    ///
    /// Pure over the current file text: extracting twice from an unchanged
    /// file yields equal closures.
    pub fn extract(&self, symbol: &ResolvedSymbol) -> Result<DependencyClosure, ProjectError> {
        self.project
            .ensure_fresh(&symbol.file_path, symbol.revision, &symbol.name)?;
        let file = self
            .project
            .file(&symbol.file_path)
            .ok_or_else(|| ProjectError::FileNotFound {
                path: symbol.file_path.clone(),
            })?;
        let stale = || ProjectError::StaleSymbol {
            name: symbol.name.clone(),
            path: symbol.file_path.clone(),
        };

        let decl = &symbol.declaration;
        let node = decl.node(file.tree()).ok_or_else(stale)?;
        let source = file.text();

        let mut imports = BTreeMap::new();
        let mut types = BTreeSet::new();
        let mut locals = BTreeSet::new();

        // Worklist over "references": each type is expanded once
        let mut queue: VecDeque<String> = referenced_names(node, source, &decl.name_span)
            .into_iter()
            .collect();
        while let Some(name) = queue.pop_front() {
            if symbol.parent.is_none() && name == symbol.name {
                continue;
            }
            if imports.contains_key(&name) || types.contains(&name) || locals.contains(&name) {
                continue;
            }

            if let Some((_, import, binding)) = file.import_for_local(&name) {
                imports.insert(
                    name,
                    ImportedName {
                        module: import.module.clone(),
                        imported: binding.imported.clone(),
                        kind: binding.kind,
                        type_only: import.type_only || binding.type_only,
                        resolved: import.resolved.clone(),
                    },
                );
                continue;
            }

            let Some(local) = file.outline().top_level(&name) else {
                continue;
            };
            if symbol.parent.as_deref() == Some(local.name.as_str()) {
                continue;
            }
            match local.kind {
                SymbolKind::Interface | SymbolKind::Type => {
                    let type_node = local.node(file.tree()).ok_or_else(stale)?;
                    queue.extend(referenced_names(type_node, source, &local.name_span));
                    types.insert(name);
                }
                _ => {
                    locals.insert(name);
                }
            }
        }

        let mut type_decls: Vec<_> = types
            .iter()
            .filter_map(|name| file.outline().top_level(name))
            .collect();
        type_decls.sort_by_key(|d| d.span.start);
        let type_declarations: Vec<TypeDeclaration> = type_decls
            .iter()
            .map(|d| TypeDeclaration {
                name: d.name.clone(),
                text: source[d.span.clone()].to_string(),
            })
            .collect();

        let declaration_text = declaration_text(file, symbol);
        let mut text = type_declarations
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&declaration_text);

        debug!(
            symbol = %symbol.name,
            imports = imports.len(),
            types = types.len(),
            locals = locals.len(),
            "extracted dependency closure"
        );

        Ok(DependencyClosure {
            text,
            declaration_text,
            imports,
            types,
            type_declarations,
            locals,
        })
    }
}

/// Standalone source of the declaration.
///
/// A declarator sharing its statement is rebuilt as its own statement with
/// the original keyword and export marker.
fn declaration_text(file: &SourceFile, symbol: &ResolvedSymbol) -> String {
    let decl = &symbol.declaration;
    let source = file.text();
    if !decl.shares_statement {
        return source[decl.span.clone()].to_string();
    }

    let export = if decl.exported { "export " } else { "" };
    let keyword = decl.var_keyword.as_deref().unwrap_or("const");
    format!("{export}{keyword} {};", &source[decl.node_span.clone()])
}
