//! Project path handling.
//!
//! Every path stored in the project model is root-relative and uses forward
//! slashes. [`PathResolver`] converts between that canonical form, absolute
//! filesystem paths and the relative module specifiers used by `import`.

use std::path::{Path, PathBuf};

/// Extensions stripped from module specifiers, longest first.
const MODULE_EXTENSIONS: &[&str] = &[
    ".d.mts", ".d.cts", ".d.ts", ".tsx", ".mts", ".cts", ".ts", ".jsx", ".mjs", ".cjs", ".js",
];

/// Resolves paths relative to a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical forward-slash form of `path`.
    ///
    /// Backslashes become slashes, empty and `.` segments are dropped and `..`
    /// collapses against a preceding segment where one exists. Idempotent.
    pub fn normalize(path: &str) -> String {
        let unified = path.replace('\\', "/");
        let absolute = unified.starts_with('/');

        let mut segments: Vec<&str> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(&last) if last != ".." => {
                        segments.pop();
                    }
                    _ if absolute => {}
                    _ => segments.push(".."),
                },
                other => segments.push(other),
            }
        }

        let joined = segments.join("/");
        match (absolute, joined.is_empty()) {
            (true, _) => format!("/{joined}"),
            (false, true) => ".".to_string(),
            (false, false) => joined,
        }
    }

    /// Absolute filesystem path for a root-relative `path`.
    ///
    /// Does not check existence. Already absolute paths are returned as is.
    pub fn to_absolute(&self, path: &str) -> PathBuf {
        let normalized = Self::normalize(path);
        if Path::new(&normalized).is_absolute() {
            PathBuf::from(normalized)
        } else {
            self.root.join(normalized)
        }
    }

    /// Root-relative canonical form of an absolute `path`, if it lies under the root.
    pub fn to_relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        Some(Self::normalize(&relative.to_string_lossy()))
    }

    /// Module specifier `from_file` would use to import from `to_file`.
    ///
    /// The result has no extension and always starts with `./` or `../`.
    ///
    /// ```
    /// use symbol_refactor::paths::PathResolver;
    ///
    /// assert_eq!(PathResolver::relative_import_path("src/a.ts", "src/b.ts"), "./b");
    /// assert_eq!(
    ///     PathResolver::relative_import_path("src/api/a.ts", "src/models/user.ts"),
    ///     "../models/user"
    /// );
    /// ```
    pub fn relative_import_path(from_file: &str, to_file: &str) -> String {
        let from = Self::normalize(from_file);
        let to = strip_module_extension(&Self::normalize(to_file)).to_string();

        let from_dir: Vec<&str> = dir_segments(&from);
        let to_segments: Vec<&str> = to.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
        let (to_file_name, to_dir) = match to_segments.split_last() {
            Some((name, dir)) => (*name, dir),
            None => return "./".to_string(),
        };

        let common = from_dir
            .iter()
            .zip(to_dir.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let ups = from_dir.len() - common;
        let mut parts: Vec<&str> = Vec::with_capacity(ups + to_dir.len() - common + 1);
        parts.extend(std::iter::repeat_n("..", ups));
        parts.extend(&to_dir[common..]);
        parts.push(to_file_name);

        if ups == 0 {
            format!("./{}", parts.join("/"))
        } else {
            parts.join("/")
        }
    }

    /// Root-relative path a relative specifier in `from_file` points at, without extension.
    pub fn resolve_import(from_file: &str, specifier: &str) -> String {
        let from = Self::normalize(from_file);
        let dir = dir_segments(&from).join("/");
        if dir.is_empty() {
            Self::normalize(specifier)
        } else {
            Self::normalize(&format!("{dir}/{specifier}"))
        }
    }

    /// Whether `path` exists on the real filesystem.
    ///
    /// Files that only live in the in-memory project model report `false`.
    pub fn exists_on_disk(&self, path: &str) -> bool {
        self.to_absolute(path).is_file()
    }
}

/// Whether `specifier` is a relative module reference (`./x`, `../x`).
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// `path` without its TypeScript/JavaScript module extension.
pub fn strip_module_extension(path: &str) -> &str {
    MODULE_EXTENSIONS
        .iter()
        .find_map(|ext| path.strip_suffix(ext))
        .unwrap_or(path)
}

fn dir_segments(file: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = file.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    segments.pop();
    segments
}
