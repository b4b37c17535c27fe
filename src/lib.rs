//! Symbol Refactor: batch symbol-level refactoring for TypeScript projects
//!
//! Rename, move and remove named declarations (functions, classes,
//! interfaces, type aliases, enums, variables, and class or interface
//! members) across a multi-file project, rewriting every import and
//! reference, and commit the whole batch as one unit.
//!
//! # Architecture
//!
//! - [`project::ProjectModel`] holds every source file with its parsed tree,
//!   declaration outline, imports and a reverse import index.
//! - [`symbols`] turns a [`Selector`] into a resolved declaration, finds
//!   external references and computes the dependency closure of a move.
//! - [`operations`] implements rename, move and remove. Every mutation
//!   compiles down to a single primitive: [`Edit`], a verified byte-span
//!   replacement. Intelligence lives in span acquisition (tree-sitter,
//!   ast-grep), not in the application logic.
//! - [`engine::RefactorEngine`] runs a batch in order; [`engine::run_atomic`]
//!   wraps it in a checkpoint so a failed batch leaves nothing behind.
//!
//! # Safety
//!
//! - All edits verify expected before-text before applying
//! - Edits that introduce syntax errors are refused
//! - Atomic file writes (tempfile + fsync + rename)
//! - Workspace boundary enforcement
//!
//! # Example
//!
//! ```no_run
//! use symbol_refactor::config::parse_request;
//! use symbol_refactor::engine::{run_atomic, MemoryCheckpointStore, RefactorEngine};
//! use symbol_refactor::project::{ProjectModel, ProjectOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let request = parse_request(
//!     r#"[{"operation": "remove",
//!          "selector": {"kind": "function", "name": "deprecatedHelper", "filePath": "src/utils.ts"}}]"#,
//! )?;
//!
//! let mut project = ProjectModel::open("/path/to/app", ProjectOptions::default())?;
//! let mut store = MemoryCheckpointStore::new();
//! let result = run_atomic(&mut RefactorEngine::new(&mut project), &mut store, &request)?;
//! if result.success {
//!     project.persist()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod edit;
pub mod engine;
pub mod operations;
pub mod paths;
pub mod pool;
pub mod project;
pub mod safety;
pub mod sg;
pub mod symbols;
pub mod ts;

// Re-exports
pub use config::{
    load_from_path, parse_request, BatchOptions, BatchRequest, ConfigError, Operation,
};
pub use edit::{Edit, EditError, EditVerification};
pub use engine::{
    run_atomic, BatchResult, BatchState, CheckpointStore, EngineError, MemoryCheckpointStore,
    RefactorEngine,
};
pub use operations::{OperationError, OperationResult};
pub use paths::PathResolver;
pub use project::{FileManager, ProjectError, ProjectModel, ProjectOptions};
pub use safety::{SafetyError, WorkspaceGuard};
pub use symbols::{DependencyClosure, ResolvedSymbol, Selector, SymbolExtractor, SymbolResolver};
pub use ts::{SymbolKind, TreeSitterError};
