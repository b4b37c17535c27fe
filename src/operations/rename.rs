//! Rename a symbol and every reference to it across the project.

use crate::edit::Edit;
use crate::operations::{EditSet, OperationError, OperationResult};
use crate::project::{BindingKind, ImportStatementKind, ProjectModel, SourceFile};
use crate::sg::{is_identifier, PatternMatcher};
use crate::symbols::scope::bound_at;
use crate::symbols::{identifier_occurrences, ExternalReference, ResolvedSymbol, Selector, SymbolResolver};
use tracing::info;

/// Words TypeScript refuses as declaration names.
const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with",
];

/// Rename the symbol `selector` names to `new_name`.
#[tracing::instrument(level = "debug", skip_all, fields(symbol = %selector, new_name = %new_name))]
pub fn execute(project: &mut ProjectModel, selector: &Selector, new_name: &str) -> OperationResult {
    run(project, selector, new_name).into()
}

fn run(
    project: &mut ProjectModel,
    selector: &Selector,
    new_name: &str,
) -> Result<OperationResult, OperationError> {
    let mut edits = EditSet::default();
    let mut warnings = Vec::new();

    {
        let resolver = SymbolResolver::new(project);
        let symbol = resolver
            .resolve(selector)
            .ok_or_else(|| OperationError::NotFound(resolver.describe_missing(selector)))?;

        if symbol.name == new_name {
            return Ok(OperationResult::no_op(format!(
                "'{}' is already named '{new_name}'",
                symbol.qualified_name()
            )));
        }

        let references = resolver.find_external_references(&symbol);
        let blockers = validate_new_name(project, &symbol, &references, new_name);
        if !blockers.is_empty() {
            return Err(OperationError::ValidationBlocked { blockers });
        }

        let owner = project
            .file(&symbol.file_path)
            .ok_or_else(|| OperationError::NotFound(resolver.describe_missing(selector)))?;

        if symbol.is_member() {
            member_edits(project, owner, &symbol, &references, new_name, &mut edits);
            warnings.push(format!(
                "accesses of '.{}' are matched by name; accesses on unrelated objects in {} file(s) were renamed too",
                symbol.name,
                references.len() + 1
            ));
        } else {
            top_level_edits(project, owner, &symbol, &references, new_name, &mut edits);
        }
    }

    let affected = edits.apply(project)?;
    info!(files = affected.len(), "renamed");
    Ok(OperationResult::succeeded(affected, warnings))
}

fn validate_new_name(
    project: &ProjectModel,
    symbol: &ResolvedSymbol,
    references: &[ExternalReference],
    new_name: &str,
) -> Vec<String> {
    if !is_identifier(new_name) || RESERVED_WORDS.contains(&new_name) {
        return vec![format!("'{new_name}' is not a valid identifier")];
    }

    let mut blockers = Vec::new();
    let Some(owner) = project.file(&symbol.file_path) else {
        return blockers;
    };

    match &symbol.parent {
        Some(parent) => {
            let siblings = owner
                .outline()
                .top_level(parent)
                .map(|p| p.members.as_slice())
                .unwrap_or_default();
            if siblings.iter().any(|m| m.name == new_name) {
                blockers.push(format!(
                    "Cannot rename '{}' to '{new_name}': '{parent}' already has a member named '{new_name}'",
                    symbol.qualified_name()
                ));
            }
        }
        None => {
            if declares(owner, new_name) {
                blockers.push(format!(
                    "Cannot rename '{}' to '{new_name}': '{new_name}' already exists in {}",
                    symbol.name, symbol.file_path
                ));
            }

            let mut rewritten = vec![owner];

            // Importers that bind the name unaliased get the new name too
            for reference in references {
                let Some(file) = project.file(&reference.file_path) else {
                    continue;
                };
                let renames_local = reference.imports.iter().any(|r| {
                    r.statement == ImportStatementKind::Import
                        && r.binding.kind == BindingKind::Named
                        && r.binding.imported == symbol.name
                        && !r.binding.is_aliased()
                });
                if !renames_local {
                    continue;
                }
                if declares(file, new_name) {
                    blockers.push(format!(
                        "Cannot rename '{}' to '{new_name}': '{new_name}' already exists in {}",
                        symbol.name, reference.file_path
                    ));
                }
                rewritten.push(file);
            }

            for file in rewritten {
                blockers.extend(capture_blockers(file, &symbol.name, new_name));
            }
        }
    }

    blockers
}

/// Ways writing `new_name` over the uses of `old` in `file` would change
/// what an identifier refers to.
fn capture_blockers(file: &SourceFile, old: &str, new_name: &str) -> Vec<String> {
    let mut blockers = Vec::new();

    let captured = identifier_occurrences(file, old)
        .iter()
        .filter(|o| !o.in_import && bound_at(file, &o.span, new_name))
        .count();
    if captured > 0 {
        blockers.push(format!(
            "Cannot rename '{old}' to '{new_name}': {captured} use(s) in {} are inside a scope that already binds '{new_name}'",
            file.path()
        ));
    }

    // A global of that name would start resolving to the renamed symbol
    if !declares(file, new_name)
        && identifier_occurrences(file, new_name)
            .iter()
            .any(|o| !o.in_import)
    {
        blockers.push(format!(
            "Cannot rename '{old}' to '{new_name}': {} already uses a global '{new_name}'",
            file.path()
        ));
    }

    blockers
}

/// Whether `name` is bound at the top level of `file`.
fn declares(file: &SourceFile, name: &str) -> bool {
    file.outline().top_level(name).is_some() || file.import_for_local(name).is_some()
}

fn rename_occurrences(file: &SourceFile, old: &str, new_name: &str, edits: &mut EditSet) {
    for occurrence in identifier_occurrences(file, old) {
        if occurrence.in_import {
            continue;
        }
        let replacement = if occurrence.shorthand {
            format!("{old}: {new_name}")
        } else {
            new_name.to_string()
        };
        edits.push(Edit::new(
            file.path(),
            occurrence.span.start,
            occurrence.span.end,
            replacement,
            old,
        ));
    }
}

fn top_level_edits(
    project: &ProjectModel,
    owner: &SourceFile,
    symbol: &ResolvedSymbol,
    references: &[ExternalReference],
    new_name: &str,
    edits: &mut EditSet,
) {
    let old = symbol.name.as_str();
    rename_occurrences(owner, old, new_name, edits);

    for reference in references {
        let Some(file) = project.file(&reference.file_path) else {
            continue;
        };

        for import in &reference.imports {
            let binding = &import.binding;
            match binding.kind {
                BindingKind::Named if binding.imported == old => {
                    let Some(span) = binding.name_span.clone() else {
                        continue;
                    };
                    edits.push(Edit::new(file.path(), span.start, span.end, new_name, old));
                    // `{ old as alias }` and re-exports keep their local name
                    let keep_local = binding.is_aliased()
                        || import.statement == ImportStatementKind::ReExport;
                    if !keep_local {
                        rename_occurrences(file, old, new_name, edits);
                    }
                }
                BindingKind::Namespace if import.statement == ImportStatementKind::Import => {
                    let matcher = PatternMatcher::new(file.text(), file.language());
                    let Ok(accesses) = matcher.namespace_accesses(&binding.local, old) else {
                        continue;
                    };
                    for access in accesses {
                        let span = access.property_span;
                        edits.push(Edit::new(file.path(), span.start, span.end, new_name, old));
                    }
                }
                // Default imports and `export *` carry no name
                _ => {}
            }
        }
    }
}

fn member_edits(
    project: &ProjectModel,
    owner: &SourceFile,
    symbol: &ResolvedSymbol,
    references: &[ExternalReference],
    new_name: &str,
    edits: &mut EditSet,
) {
    let old = symbol.name.as_str();
    let span = symbol.declaration.name_span.clone();
    edits.push(Edit::new(owner.path(), span.start, span.end, new_name, old));

    let files = std::iter::once(owner)
        .chain(references.iter().filter_map(|r| project.file(&r.file_path)));
    for file in files {
        let matcher = PatternMatcher::new(file.text(), file.language());
        let Ok(accesses) = matcher.member_accesses(old) else {
            continue;
        };
        for access in accesses {
            let span = access.property_span;
            edits.push(Edit::new(file.path(), span.start, span.end, new_name, old));
        }
    }
}
