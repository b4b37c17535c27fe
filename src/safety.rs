use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory names whose contents are never refactored, wherever they sit.
const FORBIDDEN_COMPONENTS: &[&str] = &["node_modules", ".git"];

/// Workspace safety checks to prevent editing files outside the target workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Absolute path to workspace root
    workspace_root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl WorkspaceGuard {
    /// Create a new workspace guard with the given root.
    ///
    /// The workspace root will be canonicalized to handle symlinks correctly.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;

        let mut forbidden_paths = Vec::new();

        // Global package manager caches
        if let Some(home) = home::home_dir() {
            for cache in [".npm", ".yarn", ".pnpm-store"] {
                if let Ok(path) = home.join(cache).canonicalize() {
                    forbidden_paths.push(path);
                }
            }
        }

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Check if a path is safe to edit.
    ///
    /// Returns the absolute path with symlinks resolved. The path itself does
    /// not have to exist yet: its nearest existing ancestor is canonicalized
    /// and the remaining components are appended, so a move target that is
    /// about to be created is checked against where it will actually land.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        // Resolve relative paths against workspace root
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let canonical = canonicalize_lenient(&absolute)?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    /// Boolean form of [`validate_path`](Self::validate_path) for callers
    /// that only need a yes/no answer.
    pub fn validate_access(&self, path: impl AsRef<Path>) -> bool {
        self.validate_path(path).is_ok()
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        // Only components below the root count; a workspace may itself live
        // somewhere under a `.git` checkout of something else.
        if let Ok(inside) = canonical.strip_prefix(&self.workspace_root) {
            let mut prefix = self.workspace_root.clone();
            for component in inside.components() {
                prefix.push(component);
                if FORBIDDEN_COMPONENTS
                    .iter()
                    .any(|name| component.as_os_str() == OsStr::new(name))
                {
                    return Err(SafetyError::ForbiddenPath {
                        path: canonical.to_path_buf(),
                        forbidden: prefix,
                    });
                }
            }
        }

        Ok(())
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Create a guard with custom forbidden paths (for testing).
    #[cfg(test)]
    pub fn with_forbidden(
        workspace_root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;
        Ok(Self {
            workspace_root,
            forbidden_paths: forbidden,
        })
    }
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest.
///
/// `..` components in the non-existing tail are folded lexically.
fn canonicalize_lenient(path: &Path) -> Result<PathBuf, SafetyError> {
    let mut existing = path;
    let mut tail = Vec::new();
    while !existing.exists() {
        let (Some(parent), Some(last)) = (existing.parent(), existing.components().next_back())
        else {
            // Nothing on the way up exists; let canonicalize report it
            break;
        };
        tail.push(last.as_os_str().to_os_string());
        existing = parent;
    }

    let mut resolved = existing.canonicalize()?;
    for name in tail.into_iter().rev() {
        match Path::new(&name).components().next() {
            Some(Component::ParentDir) => {
                resolved.pop();
            }
            Some(Component::CurDir) => {}
            _ => resolved.push(name),
        }
    }
    Ok(resolved)
}
