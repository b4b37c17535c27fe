use crate::paths::PathResolver;
use crate::project::{ProjectError, ProjectModel, SourceFile};
use tracing::debug;

/// File-level create/read/replace operations on a [`ProjectModel`].
///
/// Operation handlers go through this instead of touching the model's
/// storage so that "create on first use" behaves the same everywhere.
pub struct FileManager<'p> {
    project: &'p mut ProjectModel,
}

impl<'p> FileManager<'p> {
    pub fn new(project: &'p mut ProjectModel) -> Self {
        Self { project }
    }

    /// Return the file at `path`, loading it from disk or creating it empty.
    ///
    /// Idempotent: an already loaded file is returned unchanged.
    pub fn ensure_file(&mut self, path: &str) -> Result<&SourceFile, ProjectError> {
        let path = PathResolver::normalize(path);
        if !self.project.contains(&path) {
            if self.project.exists_on_disk(&path) {
                debug!(path = %path, "loading file from disk");
                self.project.load_file(&path)?;
            } else {
                debug!(path = %path, "creating empty file");
                self.project.set_content(&path, String::new())?;
            }
        }
        self.project
            .file(&path)
            .ok_or(ProjectError::FileNotFound { path })
    }

    /// Replace the full content of `path`, creating it if needed.
    pub fn overwrite(&mut self, path: &str, content: impl Into<String>) -> Result<&SourceFile, ProjectError> {
        let path = PathResolver::normalize(path);
        self.project.set_content(&path, content.into())?;
        self.project
            .file(&path)
            .ok_or(ProjectError::FileNotFound { path })
    }

    /// Current text of `path`, if loaded.
    pub fn read(&self, path: &str) -> Option<&str> {
        self.project.file(path).map(SourceFile::text)
    }
}
