//! End-to-end scenarios against real workspaces on disk.
//!
//! Each test writes a small TypeScript project into a temp dir, opens it,
//! runs a batch through the engine and checks what was persisted.

mod batch_atomicity;
mod move_symbol;
mod remove;
mod rename;

use std::fs;
use std::path::Path;
use symbol_refactor::config::{parse_request, BatchRequest};
use symbol_refactor::engine::{run_atomic, BatchResult, MemoryCheckpointStore, RefactorEngine};
use symbol_refactor::project::{ProjectModel, ProjectOptions};
use tempfile::TempDir;

pub fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, contents) in files {
        let absolute = dir.path().join(path);
        fs::create_dir_all(absolute.parent().unwrap()).unwrap();
        fs::write(absolute, contents).unwrap();
    }
    dir
}

pub fn read(dir: &TempDir, path: &str) -> String {
    fs::read_to_string(dir.path().join(path)).unwrap()
}

/// Open `root`, run `request` atomically and persist on success.
pub fn run(root: &Path, request: &str) -> BatchResult {
    let request: BatchRequest = parse_request(request).unwrap();
    let mut project = ProjectModel::open(root, ProjectOptions::default()).unwrap();
    let mut store = MemoryCheckpointStore::new();
    let result = {
        let mut engine = RefactorEngine::new(&mut project);
        run_atomic(&mut engine, &mut store, &request).unwrap()
    };
    if result.success {
        project.persist().unwrap();
    }
    result
}
