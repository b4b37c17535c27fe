//! Rename, move and remove handlers.
//!
//! Every handler follows the same shape: resolve the selector, validate,
//! collect verified [`Edit`]s per file, apply them through the project model
//! and report an [`OperationResult`]. Operation-level failures never escape
//! as errors; they are folded into the result.

pub mod imports;
pub mod move_symbol;
pub mod remove;
pub mod rename;

use crate::edit::Edit;
use crate::project::{ProjectError, ProjectModel};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use thiserror::Error;

/// Why a single operation failed.
#[derive(Error, Debug)]
pub enum OperationError {
    /// The selector does not resolve
    #[error("{0}")]
    NotFound(String),

    /// A precondition failed; nothing was mutated
    #[error("{}", blockers.join("; "))]
    ValidationBlocked { blockers: Vec<String> },

    /// Rewriting a file failed
    #[error(transparent)]
    Mutation(#[from] ProjectError),
}

/// Outcome of one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    pub affected_files: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl OperationResult {
    pub fn succeeded(affected_files: BTreeSet<String>, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            affected_files,
            error: None,
            warnings,
        }
    }

    pub fn failed(error: &OperationError) -> Self {
        Self {
            success: false,
            affected_files: BTreeSet::new(),
            error: Some(error.to_string()),
            warnings: Vec::new(),
        }
    }

    /// Successful operation that changed nothing.
    pub fn no_op(reason: impl Into<String>) -> Self {
        Self::succeeded(BTreeSet::new(), vec![format!("no-op: {}", reason.into())])
    }
}

impl From<Result<OperationResult, OperationError>> for OperationResult {
    fn from(outcome: Result<OperationResult, OperationError>) -> Self {
        match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "operation failed");
                OperationResult::failed(&e)
            }
        }
    }
}

/// Edits collected across files before anything is applied.
#[derive(Debug, Default)]
pub(crate) struct EditSet {
    by_file: BTreeMap<String, Vec<Edit>>,
}

impl EditSet {
    pub fn push(&mut self, edit: Edit) {
        let edits = self.by_file.entry(edit.file.clone()).or_default();
        // The same span can be reached twice (e.g. specifier and usage scan)
        if !edits.contains(&edit) {
            edits.push(edit);
        }
    }

    pub fn extend(&mut self, edits: impl IntoIterator<Item = Edit>) {
        for edit in edits {
            self.push(edit);
        }
    }

    /// Apply every file's edits, returning the files changed.
    pub fn apply(self, project: &mut ProjectModel) -> Result<BTreeSet<String>, ProjectError> {
        let mut affected = BTreeSet::new();
        for (path, edits) in self.by_file {
            project.apply_edits(&path, edits)?;
            affected.insert(path);
        }
        Ok(affected)
    }
}

/// Grow a line-aligned removal span so it does not leave a doubled blank
/// line (or a blank line before a closing brace) behind.
pub(crate) fn tidy_removal(text: &str, span: Range<usize>) -> Range<usize> {
    let before = &text[..span.start];
    let after = &text[span.end..];
    let blank_before = before.is_empty() || before.ends_with("\n\n");

    if blank_before && after.starts_with('\n') {
        return span.start..span.end + 1;
    }
    let closes = after.is_empty() || after.trim_start_matches([' ', '\t']).starts_with('}');
    if before.ends_with("\n\n") && closes {
        return span.start - 1..span.end;
    }
    span
}
