//! Move a top-level declaration to another file.
//!
//! The declaration travels with the local interfaces and type aliases it
//! needs (copied, the source keeps its own) and the imports its body uses,
//! re-pathed for the target. Other local values it calls stay where they are
//! and are imported back from the source file, exported there if necessary.
//! Files importing the symbol from the source are pointed at the target.

use crate::edit::Edit;
use crate::operations::imports::ImportPlan;
use crate::operations::{tidy_removal, EditSet, OperationError, OperationResult};
use crate::paths::{is_relative_specifier, PathResolver};
use crate::project::{
    BindingKind, FileManager, ImportBinding, ImportStatementKind, ProjectError, ProjectModel,
    SourceFile,
};
use crate::symbols::{
    identifier_occurrences, DependencyClosure, ExternalReference, ImportRef, ImportedName,
    ResolvedSymbol, Selector, SymbolExtractor, SymbolResolver,
};
use crate::ts::{Declaration, SourceLanguage};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, info};

/// Move the symbol `selector` names into `target_file_path`.
#[tracing::instrument(level = "debug", skip_all, fields(symbol = %selector, target = %target_file_path))]
pub fn execute(project: &mut ProjectModel, selector: &Selector, target_file_path: &str) -> OperationResult {
    run(project, selector, target_file_path).into()
}

/// Everything learned about the move before anything is mutated.
struct MovePlan {
    symbol: ResolvedSymbol,
    closure: DependencyClosure,
    references: Vec<ExternalReference>,
    target: String,
}

impl MovePlan {
    fn source(&self) -> &str {
        &self.symbol.file_path
    }

    fn removal_span(&self) -> Range<usize> {
        self.symbol.declaration.removal_span.clone()
    }

    /// Whether an importer's binding follows the declaration to the target.
    ///
    /// Names exported through a local `export { .. }` clause or an
    /// `export default name` statement stay reachable through the source.
    fn binding_moves(&self, binding: &ImportBinding) -> bool {
        let decl = &self.symbol.declaration;
        match binding.kind {
            BindingKind::Named => decl.exported && !decl.default_export && binding.imported == decl.name,
            BindingKind::Default => decl.default_export,
            BindingKind::Namespace | BindingKind::All => false,
        }
    }
}

fn run(
    project: &mut ProjectModel,
    selector: &Selector,
    target_file_path: &str,
) -> Result<OperationResult, OperationError> {
    let target = PathResolver::normalize(target_file_path);

    let plan = {
        let resolver = SymbolResolver::new(project);
        let symbol = resolver
            .resolve(selector)
            .ok_or_else(|| OperationError::NotFound(resolver.describe_missing(selector)))?;

        if symbol.file_path == target {
            return Ok(OperationResult::no_op(format!(
                "'{}' already lives in {target}",
                symbol.name
            )));
        }

        let mut blockers = resolver.validate_for_move(&symbol).blockers;
        if SourceLanguage::from_path(&target).is_none() {
            blockers.push(format!("Target '{target}' is not a TypeScript source file"));
        }
        if let Some(existing) = project.file(&target) {
            blockers.extend(target_collisions(existing, &symbol));
        }
        if !blockers.is_empty() {
            return Err(OperationError::ValidationBlocked { blockers });
        }

        MovePlan {
            closure: SymbolExtractor::new(project).extract(&symbol)?,
            references: resolver.find_external_references(&symbol),
            symbol,
            target,
        }
    };

    FileManager::new(project).ensure_file(&plan.target)?;

    let mut edits = EditSet::default();
    let mut warnings = Vec::new();
    {
        let source = loaded(project, plan.source())?;
        let target = loaded(project, &plan.target)?;
        let source_uses = still_used(source, &plan.symbol.name, &plan.removal_span());

        target_edits(&plan, source, target, source_uses, &mut edits, &mut warnings);
        source_edits(&plan, source, target, source_uses, &mut edits, &mut warnings);

        for reference in &plan.references {
            if reference.file_path == plan.target {
                continue;
            }
            let importer = loaded(project, &reference.file_path)?;
            importer_edits(&plan, importer, reference, &mut edits);
        }
    }

    let affected = edits.apply(project)?;
    info!(files = affected.len(), "moved");
    Ok(OperationResult::succeeded(affected, warnings))
}

fn loaded<'p>(project: &'p ProjectModel, path: &str) -> Result<&'p SourceFile, ProjectError> {
    project.file(path).ok_or_else(|| ProjectError::FileNotFound {
        path: path.to_string(),
    })
}

fn target_collisions(target: &SourceFile, symbol: &ResolvedSymbol) -> Vec<String> {
    let mut blockers = Vec::new();
    let name = &symbol.name;

    if target.outline().top_level(name).is_some() {
        blockers.push(format!(
            "Target file {} already declares '{name}'",
            target.path()
        ));
    } else if let Some((_, decl, _)) = target.import_for_local(name) {
        if decl.resolved.as_deref() != Some(symbol.file_path.as_str()) {
            blockers.push(format!(
                "Target file {} already imports a different '{name}' from '{}'",
                target.path(),
                decl.module
            ));
        }
    }

    if symbol.declaration.default_export && target.outline().default_export.is_some() {
        blockers.push(format!(
            "Target file {} already has a default export",
            target.path()
        ));
    }
    blockers
}

/// Whether `file` binds `name` at top level, by declaration or import.
fn binds(file: &SourceFile, name: &str) -> bool {
    file.outline().top_level(name).is_some() || file.import_for_local(name).is_some()
}

/// Identifier uses of `name` outside `removed`, import statements excluded.
fn still_used(file: &SourceFile, name: &str, removed: &Range<usize>) -> bool {
    identifier_occurrences(file, name)
        .iter()
        .any(|o| !o.in_import && (o.span.end <= removed.start || o.span.start >= removed.end))
}

/// How the target imports a local value left behind in the source, and
/// whether the source must start exporting it.
fn local_binding(source: &SourceFile, decl: &Declaration) -> (ImportBinding, bool) {
    let outline = source.outline();
    if outline.public_names(decl).contains(&decl.name) {
        return (ImportBinding::named(&decl.name, &decl.name), false);
    }
    if outline.is_default_export(decl) {
        return (default_binding(&decl.name), false);
    }
    (ImportBinding::named(&decl.name, &decl.name), true)
}

fn default_binding(local: &str) -> ImportBinding {
    ImportBinding {
        kind: BindingKind::Default,
        imported: "default".to_string(),
        local: local.to_string(),
        type_only: false,
        name_span: None,
    }
}

/// Specifier the target uses for an import the moved code depends on.
fn respecify(plan: &MovePlan, import: &ImportedName) -> Option<String> {
    if let Some(resolved) = &import.resolved {
        if *resolved == plan.target {
            return None;
        }
        return Some(PathResolver::relative_import_path(&plan.target, resolved));
    }
    if is_relative_specifier(&import.module) {
        let path = PathResolver::resolve_import(plan.source(), &import.module);
        return Some(PathResolver::relative_import_path(&plan.target, &path));
    }
    Some(import.module.clone())
}

fn closure_binding(local: &str, import: &ImportedName) -> Option<ImportBinding> {
    let kind = match import.kind {
        BindingKind::All => return None,
        kind => kind,
    };
    Some(ImportBinding {
        kind,
        imported: import.imported.clone(),
        local: local.to_string(),
        type_only: import.type_only,
        name_span: None,
    })
}

fn target_edits(
    plan: &MovePlan,
    source: &SourceFile,
    target: &SourceFile,
    source_uses: bool,
    edits: &mut EditSet,
    warnings: &mut Vec<String>,
) {
    let mut imports = ImportPlan::new(target);
    let to_source = PathResolver::relative_import_path(&plan.target, plan.source());

    for (local, import) in &plan.closure.imports {
        let Some(module) = respecify(plan, import) else {
            continue;
        };
        if binds(target, local) {
            let same = target
                .import_for_local(local)
                .is_some_and(|(_, decl, _)| decl.resolved.is_some() && decl.resolved == import.resolved);
            if !same {
                warnings.push(format!(
                    "{} already binds '{local}'; the moved code now uses that binding",
                    plan.target
                ));
            }
            continue;
        }
        if let Some(binding) = closure_binding(local, import) {
            imports.add(ImportStatementKind::Import, &module, binding);
        }
    }

    for local in &plan.closure.locals {
        if binds(target, local) {
            continue;
        }
        let Some(decl) = source.outline().top_level(local) else {
            continue;
        };
        let (binding, _) = local_binding(source, decl);
        imports.add(ImportStatementKind::Import, &to_source, binding);
    }

    // The target stops importing the symbol it now declares
    if let Some(reference) = plan.references.iter().find(|r| r.file_path == plan.target) {
        for import in reference.direct_imports(plan.source()) {
            if plan.binding_moves(&import.binding) {
                imports.remove(import.decl_index, &import.binding);
            } else if import.binding.kind == BindingKind::Namespace {
                warnings.push(format!(
                    "{} uses '{}' through namespace '{}'; update those accesses by hand",
                    plan.target, plan.symbol.name, import.binding.local
                ));
            }
        }
    }

    let mut body = String::new();
    for type_decl in &plan.closure.type_declarations {
        if binds(target, &type_decl.name) {
            warnings.push(format!(
                "{} already binds '{}'; its declaration was not copied",
                plan.target, type_decl.name
            ));
            continue;
        }
        body.push_str(&type_decl.text);
        body.push_str("\n\n");
    }

    let decl = &plan.symbol.declaration;
    let mut text = plan.closure.declaration_text.clone();
    let needs_export = !plan.symbol.public_names.is_empty() || source_uses;
    if needs_export && !decl.exported {
        let at = if decl.shares_statement {
            0
        } else {
            decl.statement_span.start - decl.span.start
        };
        text.insert_str(at, "export ");
    }
    body.push_str(&text);
    body.push('\n');

    let existing = target.text();
    let separator = if existing.trim().is_empty() {
        if imports.has_additions() {
            "\n"
        } else {
            ""
        }
    } else if existing.ends_with("\n\n") {
        ""
    } else if existing.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    };

    edits.extend(imports.into_edits());
    edits.push(Edit::insert(
        target.path(),
        existing.len(),
        format!("{separator}{body}"),
    ));
    debug!(types = plan.closure.type_declarations.len(), "target prepared");
}

fn source_edits(
    plan: &MovePlan,
    source: &SourceFile,
    target: &SourceFile,
    source_uses: bool,
    edits: &mut EditSet,
    warnings: &mut Vec<String>,
) {
    let text = source.text();
    let removed = plan.removal_span();
    let span = tidy_removal(text, removed.clone());
    edits.push(Edit::delete(source.path(), span.start, span.end, &text[span.clone()]));

    // Locals the moved code imports back must be importable
    for local in &plan.closure.locals {
        if binds(target, local) {
            continue;
        }
        let Some(decl) = source.outline().top_level(local) else {
            continue;
        };
        let (_, needs_export) = local_binding(source, decl);
        if needs_export && !decl.exported {
            edits.push(Edit::insert(source.path(), decl.statement_span.start, "export "));
            warnings.push(format!(
                "exported '{local}' from {} so {} can import it",
                plan.source(),
                plan.target
            ));
        }
    }

    let mut imports = ImportPlan::new(source);
    for local in plan.closure.imports.keys() {
        if still_used(source, local, &removed) {
            continue;
        }
        if let Some((idx, _, binding)) = source.import_for_local(local) {
            imports.remove(idx, binding);
        }
    }

    let to_target = PathResolver::relative_import_path(plan.source(), &plan.target);
    if source_uses {
        let binding = if plan.symbol.declaration.default_export {
            default_binding(&plan.symbol.name)
        } else {
            ImportBinding::named(&plan.symbol.name, &plan.symbol.name)
        };
        imports.add(ImportStatementKind::Import, &to_target, binding);
    }

    // `import * as ns` and `export *` importers still reach the symbol
    // through the source
    let reached_indirectly = plan.references.iter().any(|r| {
        r.direct_imports(plan.source())
            .any(|i| matches!(i.binding.kind, BindingKind::Namespace | BindingKind::All))
    });
    if reached_indirectly && plan.symbol.declaration.exported && !plan.symbol.declaration.default_export {
        imports.add(
            ImportStatementKind::ReExport,
            &to_target,
            ImportBinding::named(&plan.symbol.name, &plan.symbol.name),
        );
        warnings.push(format!(
            "{} re-exports '{}' from {} for namespace and wildcard importers",
            plan.source(),
            plan.symbol.name,
            plan.target
        ));
    }

    edits.extend(imports.into_edits());
}

fn importer_edits(plan: &MovePlan, importer: &SourceFile, reference: &ExternalReference, edits: &mut EditSet) {
    let mut by_statement: BTreeMap<usize, Vec<&ImportRef>> = BTreeMap::new();
    for import in reference.direct_imports(plan.source()) {
        if plan.binding_moves(&import.binding) {
            by_statement.entry(import.decl_index).or_default().push(import);
        }
    }
    if by_statement.is_empty() {
        return;
    }

    let module = PathResolver::relative_import_path(importer.path(), &plan.target);
    let mut imports = ImportPlan::new(importer);
    for (idx, moving) in by_statement {
        let decl = &importer.imports()[idx];
        let all_move = decl
            .bindings
            .iter()
            .all(|b| moving.iter().any(|m| m.binding.same_binding(b)));
        if all_move {
            imports.retarget(idx, module.as_str());
            continue;
        }
        for import in moving {
            imports.remove(idx, &import.binding);
            imports.add(import.statement, &module, import.binding.clone());
        }
    }
    edits.extend(imports.into_edits());
}
