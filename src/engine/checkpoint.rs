//! Whole-workspace checkpoints and the save/execute/restore protocol.

use crate::config::BatchRequest;
use crate::engine::{BatchResult, EngineError, RefactorEngine};
use crate::project::{ProjectModel, ProjectSnapshot};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("checkpoint {0} does not exist or was already restored")]
    Unknown(u64),
}

/// Saves and restores the complete state of a project.
pub trait CheckpointStore {
    type Handle;

    fn save(&mut self, project: &ProjectModel) -> Result<Self::Handle, CheckpointError>;

    /// Put `project` back exactly as it was when `handle` was saved.
    fn restore(&mut self, project: &mut ProjectModel, handle: Self::Handle) -> Result<(), CheckpointError>;

    /// Release a checkpoint that will not be restored.
    fn discard(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CheckpointId(u64);

/// Keeps snapshots of the in-memory project model.
///
/// Restoring covers file contents, which files exist, the import index and
/// the set of files waiting to be persisted.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    snapshots: BTreeMap<u64, ProjectSnapshot>,
    next: u64,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    type Handle = CheckpointId;

    fn save(&mut self, project: &ProjectModel) -> Result<CheckpointId, CheckpointError> {
        self.next += 1;
        let snapshot = project.snapshot();
        info!(checkpoint = self.next, files = snapshot.file_count(), "checkpoint saved");
        self.snapshots.insert(self.next, snapshot);
        Ok(CheckpointId(self.next))
    }

    fn restore(&mut self, project: &mut ProjectModel, handle: CheckpointId) -> Result<(), CheckpointError> {
        let snapshot = self
            .snapshots
            .remove(&handle.0)
            .ok_or(CheckpointError::Unknown(handle.0))?;
        project.restore(snapshot);
        info!(checkpoint = handle.0, "checkpoint restored");
        Ok(())
    }

    fn discard(&mut self, handle: CheckpointId) {
        if self.snapshots.remove(&handle.0).is_some() {
            debug!(checkpoint = handle.0, "checkpoint discarded");
        }
    }
}

/// Run one batch all-or-nothing.
///
/// Saves a checkpoint, executes the batch and restores the checkpoint when
/// the batch did not succeed or the engine faulted. A committed batch
/// releases its checkpoint. The engine ends in `Committed` or `RolledBack`.
pub fn run_atomic<S: CheckpointStore>(
    engine: &mut RefactorEngine<'_>,
    store: &mut S,
    request: &BatchRequest,
) -> Result<BatchResult, EngineError> {
    let checkpoint = store.save(engine.project())?;

    match engine.execute_batch(request) {
        Ok(result) if result.success => {
            engine.commit();
            store.discard(checkpoint);
            Ok(result)
        }
        Ok(result) => {
            warn!(
                error = result.error.as_deref().unwrap_or_default(),
                "batch failed, rolling back"
            );
            engine.roll_back(store, checkpoint)?;
            Ok(result)
        }
        Err(e) => {
            warn!(error = %e, "engine fault, rolling back");
            engine.roll_back(store, checkpoint)?;
            Err(e)
        }
    }
}
