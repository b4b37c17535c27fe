//! Delete a declaration that nothing outside its file uses.

use crate::edit::Edit;
use crate::operations::{tidy_removal, EditSet, OperationError, OperationResult};
use crate::project::ProjectModel;
use crate::sg::PatternMatcher;
use crate::symbols::{identifier_occurrences, Selector, SymbolResolver};
use tracing::info;

#[tracing::instrument(level = "debug", skip_all, fields(symbol = %selector))]
pub fn execute(project: &mut ProjectModel, selector: &Selector) -> OperationResult {
    run(project, selector).into()
}

fn run(project: &mut ProjectModel, selector: &Selector) -> Result<OperationResult, OperationError> {
    let mut edits = EditSet::default();
    let mut warnings = Vec::new();

    {
        let resolver = SymbolResolver::new(project);
        let symbol = resolver
            .resolve(selector)
            .ok_or_else(|| OperationError::NotFound(resolver.describe_missing(selector)))?;

        let validation = resolver.validate_for_removal(&symbol);
        if !validation.can_proceed {
            return Err(OperationError::ValidationBlocked {
                blockers: validation.blockers,
            });
        }

        let file = project
            .file(&symbol.file_path)
            .ok_or_else(|| OperationError::NotFound(resolver.describe_missing(selector)))?;
        let span = symbol.declaration.removal_span.clone();
        let outside = |s: &std::ops::Range<usize>| s.end <= span.start || s.start >= span.end;

        // Same-file uses are not blockers, but the file will no longer compile
        let remaining = if symbol.is_member() {
            PatternMatcher::new(file.text(), file.language())
                .member_accesses(&symbol.name)
                .map(|accesses| {
                    accesses
                        .iter()
                        .filter(|a| outside(&a.property_span))
                        .count()
                })
                .unwrap_or(0)
        } else {
            identifier_occurrences(file, &symbol.name)
                .iter()
                .filter(|o| !o.in_import && outside(&o.span))
                .count()
        };
        if remaining > 0 {
            warnings.push(format!(
                "'{}' is still used {remaining} time(s) in {}",
                symbol.qualified_name(),
                symbol.file_path
            ));
        }

        let span = tidy_removal(file.text(), span);
        edits.push(Edit::delete(
            file.path(),
            span.start,
            span.end,
            &file.text()[span.clone()],
        ));
    }

    let affected = edits.apply(project)?;
    info!(files = affected.len(), "removed");
    Ok(OperationResult::succeeded(affected, warnings))
}
