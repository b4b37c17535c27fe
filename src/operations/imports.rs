//! Planned import-statement changes for one file.

use crate::edit::Edit;
use crate::project::file::render_statement;
use crate::project::{BindingKind, ImportBinding, ImportStatementKind, SourceFile};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct StatementChange {
    retarget: Option<String>,
    removed: Vec<ImportBinding>,
    added: Vec<ImportBinding>,
}

/// Accumulates binding removals, additions and specifier retargets for one
/// file and renders them as edits, one per touched statement plus a single
/// insertion for new statements.
pub(crate) struct ImportPlan<'f> {
    file: &'f SourceFile,
    changes: BTreeMap<usize, StatementChange>,
    additions: Vec<(ImportStatementKind, String, ImportBinding)>,
}

impl<'f> ImportPlan<'f> {
    pub fn new(file: &'f SourceFile) -> Self {
        Self {
            file,
            changes: BTreeMap::new(),
            additions: Vec::new(),
        }
    }

    pub fn has_additions(&self) -> bool {
        !self.additions.is_empty()
    }

    /// Point statement `decl_index` at `module` without touching its bindings.
    pub fn retarget(&mut self, decl_index: usize, module: impl Into<String>) {
        self.changes.entry(decl_index).or_default().retarget = Some(module.into());
    }

    /// Drop `binding` from statement `decl_index`.
    pub fn remove(&mut self, decl_index: usize, binding: &ImportBinding) {
        let change = self.changes.entry(decl_index).or_default();
        if !change.removed.iter().any(|b| b.same_binding(binding)) {
            change.removed.push(binding.clone());
        }
    }

    /// Import `binding` from `module`, merging into an existing statement
    /// for the same module when one can take it.
    pub fn add(&mut self, kind: ImportStatementKind, module: &str, binding: ImportBinding) {
        let binding = ImportBinding {
            name_span: None,
            ..binding
        };

        let existing = self.file.imports().iter().enumerate().find(|(idx, decl)| {
            decl.kind == kind
                && decl.module == module
                && !self.is_removed_entirely(*idx)
                && self.changes.get(idx).is_none_or(|c| c.retarget.is_none())
                && decl.bindings.iter().any(|b| b.same_binding(&binding))
        });
        if existing.is_some() {
            return;
        }

        let mergeable = self.file.imports().iter().enumerate().find(|(idx, decl)| {
            decl.kind == kind
                && decl.module == module
                && !decl.bindings.is_empty()
                && !decl.has_namespace()
                && binding.kind != BindingKind::Namespace
                && (!decl.type_only || binding.type_only)
                && !(binding.kind == BindingKind::Default
                    && decl.bindings.iter().any(|b| b.kind == BindingKind::Default))
                && self.changes.get(idx).is_none_or(|c| c.retarget.is_none())
        });

        match mergeable {
            Some((idx, _)) => {
                let change = self.changes.entry(idx).or_default();
                if !change.added.iter().any(|b| b.same_binding(&binding)) {
                    change.added.push(binding);
                }
            }
            None => {
                let duplicate = self
                    .additions
                    .iter()
                    .any(|(k, m, b)| *k == kind && m == module && b.same_binding(&binding));
                if !duplicate {
                    self.additions.push((kind, module.to_string(), binding));
                }
            }
        }
    }

    fn is_removed_entirely(&self, decl_index: usize) -> bool {
        let Some(change) = self.changes.get(&decl_index) else {
            return false;
        };
        let decl = &self.file.imports()[decl_index];
        change.added.is_empty()
            && decl
                .bindings
                .iter()
                .all(|b| change.removed.iter().any(|r| r.same_binding(b)))
    }

    /// Render the plan as edits against the file's current text.
    pub fn into_edits(self) -> Vec<Edit> {
        let file = self.file;
        let path = file.path();
        let text = file.text();
        let mut edits = Vec::new();

        for (idx, change) in &self.changes {
            let decl = &file.imports()[*idx];

            if change.removed.is_empty() && change.added.is_empty() {
                if let Some(module) = &change.retarget {
                    let span = decl.specifier_span.clone();
                    edits.push(Edit::new(path, span.start, span.end, module.as_str(), &text[span]));
                }
                continue;
            }

            let mut remaining: Vec<ImportBinding> = decl
                .bindings
                .iter()
                .filter(|b| !change.removed.iter().any(|r| r.same_binding(b)))
                .cloned()
                .collect();
            remaining.extend(change.added.iter().cloned());

            if remaining.is_empty() {
                let span = decl.removal_span.clone();
                edits.push(Edit::delete(path, span.start, span.end, &text[span]));
            } else {
                let module = change.retarget.as_deref().unwrap_or(&decl.module);
                let span = decl.statement_span.clone();
                edits.push(Edit::new(
                    path,
                    span.start,
                    span.end,
                    decl.render(&remaining, module),
                    &text[span],
                ));
            }
        }

        if !self.additions.is_empty() {
            let (quote, semicolon) = file
                .imports()
                .first()
                .map_or(('"', true), |d| (d.quote, d.semicolon));

            let mut grouped: Vec<(ImportStatementKind, String, Vec<ImportBinding>)> = Vec::new();
            for (kind, module, binding) in self.additions {
                match grouped
                    .iter_mut()
                    .find(|(k, m, bs)| *k == kind && *m == module && can_share(bs, &binding))
                {
                    Some((_, _, bindings)) => bindings.push(binding),
                    None => grouped.push((kind, module, vec![binding])),
                }
            }

            let insertion = file.import_insertion();
            let mut block = String::from(insertion.prefix);
            for (kind, module, bindings) in &grouped {
                let type_only = bindings.iter().all(|b| b.type_only);
                let bindings: Vec<ImportBinding> = bindings
                    .iter()
                    .map(|b| ImportBinding {
                        type_only: b.type_only && !type_only,
                        ..b.clone()
                    })
                    .collect();
                block.push_str(&render_statement(
                    *kind, type_only, &bindings, module, quote, semicolon,
                ));
                block.push('\n');
            }
            block.push_str(insertion.suffix);
            edits.push(Edit::insert(path, insertion.at, block));
        }

        edits
    }
}

/// Whether `binding` can join a new statement already holding `bindings`.
fn can_share(bindings: &[ImportBinding], binding: &ImportBinding) -> bool {
    let has = |kind| bindings.iter().any(|b| b.kind == kind);
    match binding.kind {
        BindingKind::Namespace | BindingKind::All => bindings.is_empty(),
        BindingKind::Default => !has(BindingKind::Default) && !has(BindingKind::Namespace),
        BindingKind::Named => !has(BindingKind::Namespace) && !has(BindingKind::All),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectModel;

    fn apply(file: &SourceFile, edits: Vec<Edit>) -> String {
        Edit::apply_all(file.text(), edits).unwrap()
    }

    fn project(source: &str) -> ProjectModel {
        let mut project = ProjectModel::in_memory("/p");
        project.add_source("src/a.ts", source).unwrap();
        project
    }

    #[test]
    fn merge_into_existing_statement() {
        let project = project("import { a } from './mod';\n\nexport const x = a;\n");
        let file = project.file("src/a.ts").unwrap();

        let mut plan = ImportPlan::new(file);
        plan.add(ImportStatementKind::Import, "./mod", ImportBinding::named("b", "b"));
        let result = apply(file, plan.into_edits());
        assert_eq!(result, "import { a, b } from './mod';\n\nexport const x = a;\n");
    }

    #[test]
    fn add_new_statement_after_imports() {
        let project = project("import { a } from './mod';\n\nexport const x = a;\n");
        let file = project.file("src/a.ts").unwrap();

        let mut plan = ImportPlan::new(file);
        plan.add(ImportStatementKind::Import, "./other", ImportBinding::named("b", "b"));
        plan.add(ImportStatementKind::Import, "./other", ImportBinding::named("c", "c"));
        let result = apply(file, plan.into_edits());
        assert_eq!(
            result,
            "import { a } from './mod';\nimport { b, c } from './other';\n\nexport const x = a;\n"
        );
    }

    #[test]
    fn existing_binding_is_not_duplicated() {
        let project = project("import { a } from './mod';\n");
        let file = project.file("src/a.ts").unwrap();

        let mut plan = ImportPlan::new(file);
        plan.add(ImportStatementKind::Import, "./mod", ImportBinding::named("a", "a"));
        assert!(!plan.has_additions());
        assert!(plan.into_edits().is_empty());
    }

    #[test]
    fn removing_last_binding_drops_statement() {
        let project = project("import { a } from './mod';\nimport { b, c } from './other';\nexport {};\n");
        let file = project.file("src/a.ts").unwrap();
        let a = file.imports()[0].bindings[0].clone();
        let b = file.imports()[1].bindings[0].clone();

        let mut plan = ImportPlan::new(file);
        plan.remove(0, &a);
        plan.remove(1, &b);
        let result = apply(file, plan.into_edits());
        assert_eq!(result, "import { c } from './other';\nexport {};\n");
    }

    #[test]
    fn retarget_rewrites_only_specifier() {
        let project = project("import { a } from \"./old\";\n");
        let file = project.file("src/a.ts").unwrap();

        let mut plan = ImportPlan::new(file);
        plan.retarget(0, "./new");
        assert_eq!(apply(file, plan.into_edits()), "import { a } from \"./new\";\n");
    }

    #[test]
    fn first_import_in_empty_file() {
        let mut project = ProjectModel::in_memory("/p");
        project.add_source("src/a.ts", "").unwrap();
        let file = project.file("src/a.ts").unwrap();

        let mut plan = ImportPlan::new(file);
        plan.add(
            ImportStatementKind::Import,
            "./types",
            ImportBinding {
                type_only: true,
                ..ImportBinding::named("User", "User")
            },
        );
        assert_eq!(
            apply(file, plan.into_edits()),
            "import type { User } from \"./types\";\n"
        );
    }
}
