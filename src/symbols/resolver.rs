//! Selector resolution, export analysis and cross-file reference lookup.

use crate::project::{BindingKind, ImportBinding, ImportStatementKind, ProjectModel, SourceFile};
use crate::sg::PatternMatcher;
use crate::symbols::Selector;
use crate::ts::{Declaration, StructuralTarget, SymbolKind};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A selector matched against a concrete declaration.
///
/// Only valid while the owning file stays at `revision`; mutating entry
/// points check this and refuse stale symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
    pub name: String,
    /// Declared kind (a `function` selector may resolve to an arrow-function variable)
    pub kind: SymbolKind,
    pub file_path: String,
    pub parent: Option<String>,
    pub is_exported: bool,
    /// Names importers use for it, `default` included when default-exported
    pub public_names: Vec<String>,
    pub declaration: Declaration,
    pub revision: u64,
}

impl ResolvedSymbol {
    pub fn is_member(&self) -> bool {
        self.parent.is_some()
    }

    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent}.{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn is_default_export(&self) -> bool {
        self.public_names.iter().any(|n| n == "default")
    }
}

/// Outcome of a precondition check. Non-empty blockers forbid mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub can_proceed: bool,
    pub blockers: Vec<String>,
}

impl ValidationResult {
    pub fn from_blockers(blockers: Vec<String>) -> Self {
        Self {
            can_proceed: blockers.is_empty(),
            blockers,
        }
    }
}

/// One import binding through which a file reaches a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// Index into the importing file's import list
    pub decl_index: usize,
    pub binding: ImportBinding,
    pub statement: ImportStatementKind,
    /// File the import statement resolves to: the owner, or a re-exporting file
    pub via: String,
}

/// A file outside the owner that refers to a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    pub file_path: String,
    pub imports: Vec<ImportRef>,
    /// `.member` accesses counted for member symbols
    pub member_accesses: usize,
}

impl ExternalReference {
    /// Imports that point straight at `owner` rather than at a re-export.
    pub fn direct_imports<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a ImportRef> {
        self.imports.iter().filter(move |r| r.via == owner)
    }
}

/// Resolves selectors against a [`ProjectModel`].
pub struct SymbolResolver<'p> {
    project: &'p ProjectModel,
}

impl<'p> SymbolResolver<'p> {
    pub fn new(project: &'p ProjectModel) -> Self {
        Self { project }
    }

    /// Look a selector up in its owning file.
    ///
    /// "Not found" is an ordinary outcome and yields `None`.
    pub fn resolve(&self, selector: &Selector) -> Option<ResolvedSymbol> {
        let path = selector.normalized_path();
        let file = self.project.file(&path)?;
        let declaration = file.outline().find(&selector.target())?;

        let public_names = match &selector.parent {
            Some(_) => Vec::new(),
            None => public_names(file, declaration),
        };

        debug!(symbol = %selector, path = %path, "resolved");
        Some(ResolvedSymbol {
            name: declaration.name.clone(),
            kind: declaration.kind,
            file_path: path,
            parent: declaration.parent.clone(),
            is_exported: self.is_exported(declaration),
            public_names,
            declaration: declaration.clone(),
            revision: file.revision(),
        })
    }

    /// The error message for a selector that does not resolve.
    pub fn describe_missing(&self, selector: &Selector) -> String {
        let path = selector.normalized_path();
        let Some(file) = self.project.file(&path) else {
            return format!(
                "{} '{}' not found in {path} (file is not part of the project)",
                selector.kind, selector.name
            );
        };
        let outline = file.outline();

        let candidates: Vec<&Declaration> = match &selector.parent {
            None => outline.declarations.iter().collect(),
            Some(parent) => {
                let container = outline.find(&StructuralTarget::Declaration {
                    kind: parent.kind.unwrap_or(SymbolKind::Class),
                    name: parent.name.clone(),
                });
                let container = container.or_else(|| outline.top_level(&parent.name));
                match container {
                    Some(container) => container.members.iter().collect(),
                    None => {
                        let kind = parent
                            .kind
                            .map_or_else(|| "container".to_string(), |k| k.to_string());
                        return format!("{kind} '{}' not found in {path}", parent.name);
                    }
                }
            }
        };

        let suggestion = candidates
            .iter()
            .filter(|d| selector.kind.accepts(d))
            .map(|d| (strsim::jaro_winkler(&selector.name, &d.name), &d.name))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0));

        let mut message = format!(
            "{} '{}' not found in {path}",
            selector.kind,
            selector.qualified_name()
        );
        if let Some((_, name)) = suggestion {
            message.push_str(&format!(" (did you mean '{name}'?)"));
        }
        message
    }

    /// True iff the declaration carries `export` at its declaration site.
    pub fn is_exported(&self, declaration: &Declaration) -> bool {
        declaration.exported
    }

    /// Files outside the owner that reference `symbol`, sorted by path.
    ///
    /// Follows re-export chains (`export { x } from`, `export * from`) so a
    /// file importing the symbol through a barrel counts as a reference.
    pub fn find_external_references(&self, symbol: &ResolvedSymbol) -> Vec<ExternalReference> {
        if let Some(parent) = &symbol.parent {
            return self.find_member_references(symbol, parent);
        }

        let mut references: BTreeMap<String, ExternalReference> = BTreeMap::new();
        let mut visited: BTreeSet<String> = BTreeSet::new();
        let mut queue: VecDeque<(String, Vec<String>)> = VecDeque::new();
        queue.push_back((symbol.file_path.clone(), symbol.public_names.clone()));

        while let Some((module, names)) = queue.pop_front() {
            if names.is_empty() || !visited.insert(module.clone()) {
                continue;
            }

            for importer in self.project.importers_of(&module) {
                if importer == symbol.file_path {
                    continue;
                }
                let Some(file) = self.project.file(&importer) else {
                    continue;
                };

                for (decl_index, decl) in file.imports().iter().enumerate() {
                    if decl.resolved.as_deref() != Some(module.as_str()) {
                        continue;
                    }
                    for binding in &decl.bindings {
                        let matched = match binding.kind {
                            BindingKind::Named => names.contains(&binding.imported),
                            BindingKind::Default => names.iter().any(|n| n == "default"),
                            BindingKind::Namespace => match decl.kind {
                                ImportStatementKind::Import => {
                                    uses_namespace(file, &binding.local, &names)
                                }
                                ImportStatementKind::ReExport => false,
                            },
                            BindingKind::All => names.iter().any(|n| n != "default"),
                        };
                        if !matched {
                            continue;
                        }

                        references
                            .entry(importer.clone())
                            .or_insert_with(|| ExternalReference {
                                file_path: importer.clone(),
                                imports: Vec::new(),
                                member_accesses: 0,
                            })
                            .imports
                            .push(ImportRef {
                                decl_index,
                                binding: binding.clone(),
                                statement: decl.kind,
                                via: module.clone(),
                            });

                        if decl.kind == ImportStatementKind::ReExport {
                            let passed_on = match binding.kind {
                                BindingKind::Named => vec![binding.local.clone()],
                                BindingKind::All => names
                                    .iter()
                                    .filter(|n| n.as_str() != "default")
                                    .cloned()
                                    .collect(),
                                _ => Vec::new(),
                            };
                            queue.push_back((importer.clone(), passed_on));
                        }
                    }
                }
            }
        }

        references.into_values().collect()
    }

    fn find_member_references(&self, symbol: &ResolvedSymbol, parent: &str) -> Vec<ExternalReference> {
        let Some(file) = self.project.file(&symbol.file_path) else {
            return Vec::new();
        };
        let Some(container) = file.outline().top_level(parent) else {
            return Vec::new();
        };
        let container = ResolvedSymbol {
            name: container.name.clone(),
            kind: container.kind,
            file_path: symbol.file_path.clone(),
            parent: None,
            is_exported: container.exported,
            public_names: public_names(file, container),
            declaration: container.clone(),
            revision: file.revision(),
        };

        self.find_external_references(&container)
            .into_iter()
            .filter_map(|mut reference| {
                let importer = self.project.file(&reference.file_path)?;
                let matcher = PatternMatcher::new(importer.text(), importer.language());
                let accesses = matcher.member_accesses(&symbol.name).ok()?.len();
                (accesses > 0).then(|| {
                    reference.member_accesses = accesses;
                    reference
                })
            })
            .collect()
    }

    /// Preconditions for moving `symbol`.
    ///
    /// Destination collisions are checked by the move handler, which knows
    /// the target file.
    pub fn validate_for_move(&self, symbol: &ResolvedSymbol) -> ValidationResult {
        let mut blockers = Vec::new();
        if symbol.is_member() {
            blockers.push(format!(
                "Cannot move nested member '{}' on its own; move its parent instead",
                symbol.qualified_name()
            ));
        }
        ValidationResult::from_blockers(blockers)
    }

    /// Preconditions for removing `symbol`: nothing outside its file may use it.
    pub fn validate_for_removal(&self, symbol: &ResolvedSymbol) -> ValidationResult {
        let references = self.find_external_references(symbol);
        let mut blockers = Vec::new();
        if !references.is_empty() {
            let files: Vec<&str> = references.iter().map(|r| r.file_path.as_str()).collect();
            blockers.push(format!(
                "Symbol '{}' is referenced in {} other file(s): {}",
                symbol.qualified_name(),
                files.len(),
                files.join(", ")
            ));
        }
        ValidationResult::from_blockers(blockers)
    }
}

/// Names under which importers see `declaration`, `default` included.
fn public_names(file: &SourceFile, declaration: &Declaration) -> Vec<String> {
    let outline = file.outline();
    let mut names = outline.public_names(declaration);
    if outline.is_default_export(declaration) {
        names.push("default".to_string());
    }
    names
}

/// Whether `file` accesses any of `names` through namespace binding `namespace`.
fn uses_namespace(file: &SourceFile, namespace: &str, names: &[String]) -> bool {
    let matcher = PatternMatcher::new(file.text(), file.language());
    names.iter().filter(|n| n.as_str() != "default").any(|name| {
        matcher
            .namespace_accesses(namespace, name)
            .is_ok_and(|accesses| !accesses.is_empty())
    })
}
