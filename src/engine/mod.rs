//! Batch orchestration.
//!
//! A batch runs its operations strictly in order against one
//! [`ProjectModel`]: later operations see what earlier ones left behind.
//! The engine only edits the in-memory model. Rolling back a failed batch
//! is the job of a [`CheckpointStore`], driven by [`run_atomic`].

pub mod checkpoint;

pub use checkpoint::{run_atomic, CheckpointError, CheckpointId, CheckpointStore, MemoryCheckpointStore};

use crate::config::{BatchRequest, Operation, ValidationError};
use crate::operations::{move_symbol, remove, rename, OperationResult};
use crate::project::ProjectModel;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{info, warn};

/// Lifecycle of the batch an engine is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchState {
    Pending,
    Validating,
    Executing,
    Committed,
    RolledBack,
}

/// Faults that abort a whole batch rather than one operation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid refactor request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("checkpoint failure: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    /// One entry per attempted operation, in request order
    pub results: Vec<OperationResult>,
    /// The full requested operation list
    pub all_operations: Vec<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    /// Union of every attempted operation's affected files.
    pub fn affected_files(&self) -> BTreeSet<String> {
        self.results
            .iter()
            .flat_map(|r| r.affected_files.iter().cloned())
            .collect()
    }
}

pub struct RefactorEngine<'p> {
    project: &'p mut ProjectModel,
    state: BatchState,
}

impl<'p> RefactorEngine<'p> {
    pub fn new(project: &'p mut ProjectModel) -> Self {
        Self {
            project,
            state: BatchState::Pending,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn project(&self) -> &ProjectModel {
        self.project
    }

    /// Execute every operation of `request` in order.
    ///
    /// Operation failures are recorded in the result, never raised. With
    /// `stopOnError` the batch halts at the first failure and `results`
    /// ends with that failure.
    #[tracing::instrument(level = "debug", skip_all, fields(operations = request.operations.len()))]
    pub fn execute_batch(&mut self, request: &BatchRequest) -> Result<BatchResult, EngineError> {
        self.state = BatchState::Validating;
        if let Err(e) = request.validate() {
            self.state = BatchState::Pending;
            return Err(e.into());
        }

        self.state = BatchState::Executing;
        info!(
            operations = request.operations.len(),
            stop_on_error = request.options.stop_on_error,
            "executing batch"
        );

        let mut results = Vec::with_capacity(request.operations.len());
        let mut first_failure: Option<String> = None;

        for (index, operation) in request.operations.iter().enumerate() {
            let result = self.execute_operation(operation);
            if result.success {
                info!(index, operation = operation.name(), files = result.affected_files.len(), "operation succeeded");
            } else {
                let error = result.error.as_deref().unwrap_or("unknown error");
                warn!(index, operation = operation.name(), error, "operation failed");
                first_failure.get_or_insert_with(|| {
                    format!("Operation {} ({}) failed: {error}", index + 1, operation.describe())
                });
            }

            let failed = !result.success;
            results.push(result);
            if failed && request.options.stop_on_error {
                break;
            }
        }

        let success = first_failure.is_none();
        info!(success, attempted = results.len(), "batch finished");
        Ok(BatchResult {
            success,
            results,
            all_operations: request.operations.clone(),
            error: first_failure,
        })
    }

    /// Run a single operation against the project.
    pub fn execute_operation(&mut self, operation: &Operation) -> OperationResult {
        match operation {
            Operation::Rename {
                selector, new_name, ..
            } => rename::execute(self.project, selector, new_name),
            Operation::Move {
                selector,
                target_file_path,
                ..
            } => move_symbol::execute(self.project, selector, target_file_path),
            Operation::Remove { selector, .. } => remove::execute(self.project, selector),
        }
    }

    /// Accept the batch's changes.
    pub fn commit(&mut self) {
        self.state = BatchState::Committed;
    }

    /// Restore the project from `checkpoint` and mark the batch rolled back.
    pub fn roll_back<S: CheckpointStore>(
        &mut self,
        store: &mut S,
        checkpoint: S::Handle,
    ) -> Result<(), CheckpointError> {
        store.restore(self.project, checkpoint)?;
        self.state = BatchState::RolledBack;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchOptions;
    use crate::symbols::Selector;
    use crate::ts::SymbolKind;

    fn project() -> ProjectModel {
        let mut project = ProjectModel::in_memory("/p");
        project
            .add_source(
                "src/a.ts",
                "export function first(): number {\n    return 1;\n}\n\nexport function second(): number {\n    return 2;\n}\n",
            )
            .unwrap();
        project
            .add_source("src/b.ts", "export function third(): number {\n    return 3;\n}\n")
            .unwrap();
        project
    }

    fn remove(name: &str, path: &str) -> Operation {
        Operation::Remove {
            selector: Selector::new(SymbolKind::Function, name, path),
            reason: None,
        }
    }

    fn failing_batch(stop_on_error: bool) -> BatchRequest {
        BatchRequest {
            operations: vec![
                remove("first", "src/a.ts"),
                remove("missing", "src/a.ts"),
                remove("third", "src/b.ts"),
            ],
            options: BatchOptions { stop_on_error },
        }
    }

    #[test]
    fn stop_on_error_halts_after_failure() {
        let mut project = project();
        let before_b = project.file("src/b.ts").unwrap().text().to_string();

        let mut engine = RefactorEngine::new(&mut project);
        let result = engine.execute_batch(&failing_batch(true)).unwrap();

        assert!(!result.success);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.all_operations.len(), 3);
        assert!(result.results[0].success);
        assert!(!result.results[1].success);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .starts_with("Operation 2 (Remove missing from src/a.ts) failed: function 'missing' not found"));
        assert_eq!(engine.state(), BatchState::Executing);

        assert_eq!(project.file("src/b.ts").unwrap().text(), before_b);
    }

    #[test]
    fn continue_on_error_attempts_everything() {
        let mut project = project();
        let mut engine = RefactorEngine::new(&mut project);
        let result = engine.execute_batch(&failing_batch(false)).unwrap();

        assert!(!result.success);
        assert_eq!(result.results.len(), 3);
        assert!(result.results[2].success);
        assert_eq!(
            result.affected_files(),
            BTreeSet::from(["src/a.ts".to_string(), "src/b.ts".to_string()])
        );
    }

    #[test]
    fn operations_see_earlier_results() {
        let mut project = project();
        let request = BatchRequest::new(vec![
            Operation::Rename {
                selector: Selector::new(SymbolKind::Function, "first", "src/a.ts"),
                new_name: "initial".into(),
                reason: None,
            },
            Operation::Move {
                selector: Selector::new(SymbolKind::Function, "initial", "src/a.ts"),
                target_file_path: "src/b.ts".into(),
                reason: None,
            },
        ]);

        let result = RefactorEngine::new(&mut project).execute_batch(&request).unwrap();
        assert!(result.success, "{:?}", result.error);
        assert!(project.file("src/b.ts").unwrap().text().contains("export function initial()"));
        assert!(!project.file("src/a.ts").unwrap().text().contains("initial"));
    }

    #[test]
    fn invalid_request_is_fatal() {
        let mut project = project();
        let mut engine = RefactorEngine::new(&mut project);
        let err = engine.execute_batch(&BatchRequest::new(Vec::new())).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
        assert_eq!(engine.state(), BatchState::Pending);
    }

    #[test]
    fn run_atomic_rolls_back_failed_batch() {
        let mut project = project();
        let before: Vec<String> = project.files().map(|f| f.text().to_string()).collect();
        let dirty_before: Vec<String> = project.dirty_files().map(String::from).collect();
        let mut store = MemoryCheckpointStore::new();

        let mut engine = RefactorEngine::new(&mut project);
        let result = run_atomic(&mut engine, &mut store, &failing_batch(true)).unwrap();
        assert!(!result.success);
        assert_eq!(engine.state(), BatchState::RolledBack);

        let after: Vec<String> = project.files().map(|f| f.text().to_string()).collect();
        assert_eq!(after, before);
        // Seeded files were never persisted, so they stay pending
        let dirty_after: Vec<String> = project.dirty_files().map(String::from).collect();
        assert_eq!(dirty_after, dirty_before);
        assert_eq!(dirty_after, vec!["src/a.ts".to_string(), "src/b.ts".to_string()]);
    }

    #[test]
    fn run_atomic_commits_successful_batch() {
        let mut project = project();
        let mut store = MemoryCheckpointStore::new();
        let request = BatchRequest::new(vec![remove("second", "src/a.ts")]);

        let mut engine = RefactorEngine::new(&mut project);
        let result = run_atomic(&mut engine, &mut store, &request).unwrap();
        assert!(result.success);
        assert_eq!(engine.state(), BatchState::Committed);
        assert_eq!(
            project.file("src/a.ts").unwrap().text(),
            "export function first(): number {\n    return 1;\n}\n"
        );
    }
}
