//! In-memory project model.
//!
//! The [`ProjectModel`] owns every loaded source file for the duration of a
//! batch. All reads go through it and all mutations are funnelled through
//! [`ProjectModel::apply_edits`] / [`ProjectModel::set_content`], which keep
//! the parsed trees, declaration outlines and the reverse import index in step
//! with the text.

pub mod file;
pub mod index;
pub mod manager;

pub use file::{BindingKind, ImportBinding, ImportDecl, ImportStatementKind, SourceFile};
pub use index::ImportIndex;
pub use manager::FileManager;

use crate::edit::{atomic_write, Edit, EditError};
use crate::paths::{is_relative_specifier, strip_module_extension, PathResolver};
use crate::ts::{validator, SourceLanguage, TreeSitterError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Suffixes tried, in order, when resolving an extension-less specifier.
const RESOLUTION_SUFFIXES: &[&str] = &[
    ".ts",
    ".tsx",
    ".d.ts",
    ".mts",
    ".cts",
    "/index.ts",
    "/index.tsx",
    "/index.d.ts",
];

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan project: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("'{path}' is not a TypeScript source file")]
    UnsupportedFile { path: String },

    #[error("File '{path}' not found")]
    FileNotFound { path: String },

    #[error("'{path}' is outside the project root")]
    OutsideRoot { path: String },

    #[error(transparent)]
    Parse(#[from] TreeSitterError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("edit to {path} introduces {count} syntax error(s)")]
    IntroducesSyntaxErrors { path: String, count: usize },

    #[error("symbol '{name}' in {path} is stale: the file changed since it was resolved")]
    StaleSymbol { name: String, path: String },
}

/// Which files a project scan loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectOptions {
    /// File extensions loaded, without the dot
    pub extensions: Vec<String>,
    /// Directory names never descended into
    pub skip_dirs: Vec<String>,
    /// Skip directories starting with `.`
    pub skip_hidden: bool,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            extensions: ["ts", "tsx", "mts", "cts"].map(String::from).to_vec(),
            skip_dirs: ["node_modules", ".git", "dist", "build", "out", "coverage"]
                .map(String::from)
                .to_vec(),
            skip_hidden: true,
        }
    }
}

/// Point-in-time copy of every file in a [`ProjectModel`].
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    files: BTreeMap<String, SourceFile>,
    index: ImportIndex,
    dirty: BTreeSet<String>,
    deleted: BTreeSet<String>,
}

impl ProjectSnapshot {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// The set of loaded source files of one project.
#[derive(Debug)]
pub struct ProjectModel {
    paths: PathResolver,
    options: ProjectOptions,
    files: BTreeMap<String, SourceFile>,
    index: ImportIndex,
    dirty: BTreeSet<String>,
    deleted: BTreeSet<String>,
    last_revision: u64,
}

impl ProjectModel {
    /// An empty model rooted at `root`; nothing is read from disk.
    pub fn in_memory(root: impl Into<PathBuf>) -> Self {
        Self {
            paths: PathResolver::new(root),
            options: ProjectOptions::default(),
            files: BTreeMap::new(),
            index: ImportIndex::default(),
            dirty: BTreeSet::new(),
            deleted: BTreeSet::new(),
            last_revision: 0,
        }
    }

    /// Load every matching source file under `root`.
    #[tracing::instrument(level = "debug", skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>, options: ProjectOptions) -> Result<Self, ProjectError> {
        let root = root.as_ref();
        let mut project = Self::in_memory(root);
        project.options = options;

        let walker = WalkDir::new(root).follow_links(false).into_iter();
        let skip_dirs = project.options.skip_dirs.clone();
        let skip_hidden = project.options.skip_hidden;
        let walker = walker.filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !(skip_dirs.iter().any(|d| d.as_str() == name) || (skip_hidden && name.starts_with('.')))
        });

        let mut loaded = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || !project.wants(entry.path()) {
                continue;
            }
            let Some(path) = project.paths.to_relative(entry.path()) else {
                continue;
            };
            let text = match std::fs::read_to_string(entry.path()) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    warn!(path = %path, "skipping file that is not valid UTF-8");
                    continue;
                }
                Err(source) => return Err(ProjectError::Io { path, source }),
            };
            let revision = project.next_revision();
            let mut file = SourceFile::parse(&path, text, revision)?;
            file.on_disk = true;
            loaded.push(file);
        }

        for file in loaded {
            project.files.insert(file.path.clone(), file);
        }
        project.reresolve_all();
        debug!(files = project.files.len(), "project loaded");
        Ok(project)
    }

    fn wants(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.options
            .extensions
            .iter()
            .any(|ext| name.ends_with(&format!(".{ext}")))
    }

    fn next_revision(&mut self) -> u64 {
        self.last_revision += 1;
        self.last_revision
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    pub fn options(&self) -> &ProjectOptions {
        &self.options
    }

    pub fn file(&self, path: &str) -> Option<&SourceFile> {
        self.files.get(&PathResolver::normalize(path))
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&PathResolver::normalize(path))
    }

    /// Loaded in memory or present on disk.
    pub fn exists(&self, path: &str) -> bool {
        self.contains(path) || self.paths.exists_on_disk(path)
    }

    /// Present on disk, regardless of the in-memory state.
    pub fn exists_on_disk(&self, path: &str) -> bool {
        self.paths.exists_on_disk(path)
    }

    /// Files changed in memory since the last persist.
    pub fn dirty_files(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Files importing `path`, in path order.
    pub fn importers_of(&self, path: &str) -> Vec<String> {
        self.index
            .importers_of(&PathResolver::normalize(path))
            .map(str::to_string)
            .collect()
    }

    /// Add a file from in-memory text, replacing any existing content.
    pub fn add_source(&mut self, path: &str, text: impl Into<String>) -> Result<&SourceFile, ProjectError> {
        let path = PathResolver::normalize(path);
        self.set_content(&path, text.into())?;
        self.file(&path).ok_or(ProjectError::FileNotFound { path })
    }

    /// Load `path` from disk into the model.
    pub fn load_file(&mut self, path: &str) -> Result<&SourceFile, ProjectError> {
        let path = PathResolver::normalize(path);
        let absolute = self.paths.to_absolute(&path);
        let text = std::fs::read_to_string(&absolute).map_err(|source| ProjectError::Io {
            path: path.clone(),
            source,
        })?;
        self.insert(&path, text, true)?;
        self.file(&path).ok_or(ProjectError::FileNotFound { path })
    }

    /// Replace the full text of `path`, creating the file if needed.
    pub fn set_content(&mut self, path: &str, text: String) -> Result<(), ProjectError> {
        let path = PathResolver::normalize(path);
        let on_disk = self.files.get(&path).is_some_and(|f| f.on_disk);
        self.insert(&path, text, on_disk)?;
        self.dirty.insert(path);
        Ok(())
    }

    fn insert(&mut self, path: &str, text: String, on_disk: bool) -> Result<(), ProjectError> {
        if Path::new(path).is_absolute() || path.starts_with("..") {
            return Err(ProjectError::OutsideRoot {
                path: path.to_string(),
            });
        }

        let revision = self.next_revision();
        let mut file = SourceFile::parse(path, text, revision)?;
        file.on_disk = on_disk;

        let is_new = !self.files.contains_key(path);
        for import in &mut file.imports {
            import.resolved = self.resolve_module(path, &import.module);
        }
        self.index.update(path, file.resolved_targets());
        self.files.insert(path.to_string(), file);
        self.deleted.remove(path);

        // A new file may satisfy specifiers that previously resolved nowhere
        if is_new {
            self.reresolve_all();
        }
        Ok(())
    }

    /// Apply verified edits to one file.
    ///
    /// The edits are checked against the current text, applied bottom to top
    /// and refused if the result has more syntax errors than before.
    pub fn apply_edits(&mut self, path: &str, edits: Vec<Edit>) -> Result<(), ProjectError> {
        if edits.is_empty() {
            return Ok(());
        }
        let path = PathResolver::normalize(path);
        let file = self
            .files
            .get(&path)
            .ok_or_else(|| ProjectError::FileNotFound { path: path.clone() })?;

        let updated = Edit::apply_all(&file.text, edits)?;
        match validator::validate_edit(file.language, &file.text, &updated) {
            Ok(()) => {}
            Err(TreeSitterError::MultipleSyntaxErrors { count }) => {
                return Err(ProjectError::IntroducesSyntaxErrors { path, count });
            }
            Err(e) => return Err(e.into()),
        }

        debug!(path = %path, "applied edits");
        self.set_content(&path, updated)
    }

    /// Fail unless `path` is still at `revision`.
    pub fn ensure_fresh(&self, path: &str, revision: u64, name: &str) -> Result<(), ProjectError> {
        match self.file(path) {
            Some(file) if file.revision == revision => Ok(()),
            _ => Err(ProjectError::StaleSymbol {
                name: name.to_string(),
                path: path.to_string(),
            }),
        }
    }

    /// Drop a file from the model; it is deleted from disk on persist.
    pub fn remove_file(&mut self, path: &str) -> Option<SourceFile> {
        let path = PathResolver::normalize(path);
        let removed = self.files.remove(&path)?;
        self.index.remove(&path);
        self.dirty.remove(&path);
        if removed.on_disk {
            self.deleted.insert(path);
        }
        self.reresolve_all();
        Some(removed)
    }

    /// Project file a module specifier written in `from_file` refers to.
    ///
    /// Bare (package) specifiers never resolve. `.js` specifiers map onto
    /// their TypeScript sources.
    pub fn resolve_module(&self, from_file: &str, specifier: &str) -> Option<String> {
        if !is_relative_specifier(specifier) {
            return None;
        }
        let target = PathResolver::resolve_import(from_file, specifier);
        if SourceLanguage::from_path(&target).is_some() && self.files.contains_key(&target) {
            return Some(target);
        }

        let base = strip_module_extension(&target);
        RESOLUTION_SUFFIXES
            .iter()
            .map(|suffix| format!("{base}{suffix}"))
            .find(|candidate| self.files.contains_key(candidate))
    }

    fn reresolve_all(&mut self) {
        let updates: Vec<(String, Vec<Option<String>>)> = self
            .files
            .values()
            .map(|f| {
                let resolved = f
                    .imports
                    .iter()
                    .map(|i| self.resolve_module(&f.path, &i.module))
                    .collect();
                (f.path.clone(), resolved)
            })
            .collect();

        for (path, resolved) in updates {
            if let Some(file) = self.files.get_mut(&path) {
                for (import, target) in file.imports.iter_mut().zip(resolved) {
                    import.resolved = target;
                }
                self.index.update(&path, file.resolved_targets());
            }
        }
    }

    /// Write every changed file to disk and delete removed ones.
    ///
    /// Returns the paths written.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn persist(&mut self) -> Result<Vec<String>, ProjectError> {
        let mut written = Vec::new();
        for path in std::mem::take(&mut self.dirty) {
            let Some(file) = self.files.get_mut(&path) else {
                continue;
            };
            let absolute = self.paths.to_absolute(&path);
            atomic_write(&absolute, file.text.as_bytes())?;
            file.on_disk = true;
            written.push(path);
        }

        for path in std::mem::take(&mut self.deleted) {
            let absolute = self.paths.to_absolute(&path);
            match std::fs::remove_file(&absolute) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(ProjectError::Io { path, source }),
            }
        }

        debug!(written = written.len(), "project persisted");
        Ok(written)
    }

    /// Copy of the full in-memory state.
    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            files: self.files.clone(),
            index: self.index.clone(),
            dirty: self.dirty.clone(),
            deleted: self.deleted.clone(),
        }
    }

    /// Return to a previously taken snapshot.
    ///
    /// Files created since the snapshot disappear; restored files get fresh
    /// revisions so symbols resolved in between are detected as stale.
    pub fn restore(&mut self, snapshot: ProjectSnapshot) {
        self.files = snapshot.files;
        self.index = snapshot.index;
        self.dirty = snapshot.dirty;
        self.deleted = snapshot.deleted;
        let paths: Vec<String> = self.files.keys().cloned().collect();
        for path in paths {
            let revision = self.next_revision();
            if let Some(file) = self.files.get_mut(&path) {
                file.revision = revision;
            }
        }
    }
}
