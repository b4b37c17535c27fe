use std::io::Write;
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: byte-span replacement with verification.
///
/// Every refactoring (rename, move, remove, import rewriting) compiles down to
/// a list of these against the in-memory text of one project file. Intelligence
/// lives in span acquisition, not application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied to a buffer"]
pub struct Edit {
    /// Root-relative, normalized path of the file this edit targets
    pub file: String,
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at {file}:{byte_start}")]
    BeforeTextMismatch {
        file: String,
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in file of length {file_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        file_len: usize,
    },

    #[error("Overlapping edits in {file}: [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    Overlapping {
        file: String,
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    #[error("Edit for {found} submitted in a batch for {expected}")]
    MixedFiles { expected: String, found: String },

    #[error("Invalid edit would split a UTF-8 character")]
    InvalidUtf8Edit,

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Edit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        file: impl Into<String>,
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl AsRef<str>,
    ) -> Self {
        Self {
            file: file.into(),
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before.as_ref()),
        }
    }

    /// Zero-width insertion at `at`.
    pub fn insert(file: impl Into<String>, at: usize, text: impl Into<String>) -> Self {
        Self::new(file, at, at, text, "")
    }

    /// Deletion of `[byte_start, byte_end)`, verified against `expected`.
    pub fn delete(
        file: impl Into<String>,
        byte_start: usize,
        byte_end: usize,
        expected: impl AsRef<str>,
    ) -> Self {
        Self::new(file, byte_start, byte_end, String::new(), expected)
    }

    /// Validate the edit against the current buffer.
    fn validate(&self, content: &str) -> Result<(), EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                file_len: content.len(),
            });
        }

        if !content.is_char_boundary(self.byte_start) || !content.is_char_boundary(self.byte_end)
        {
            return Err(EditError::InvalidUtf8Edit);
        }

        let current_text = &content[self.byte_start..self.byte_end];
        if !self.expected_before.matches(current_text) {
            return Err(EditError::BeforeTextMismatch {
                file: self.file.clone(),
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current_text.to_string(),
            });
        }

        Ok(())
    }

    /// Apply this edit to a buffer, returning the new buffer.
    pub fn apply_to(&self, content: &str) -> Result<String, EditError> {
        self.validate(content)?;

        let mut new_content = String::with_capacity(
            content.len() + self.new_text.len() - (self.byte_end - self.byte_start),
        );
        new_content.push_str(&content[..self.byte_start]);
        new_content.push_str(&self.new_text);
        new_content.push_str(&content[self.byte_end..]);
        Ok(new_content)
    }

    /// Apply multiple edits for the same file in a single pass.
    ///
    /// All edits are validated against the original buffer first, then applied
    /// bottom-to-top so earlier offsets stay valid. Insertions sharing an offset
    /// keep their submission order; a replacement starting at the same offset
    /// as an insertion is applied before it.
    pub fn apply_all(content: &str, edits: Vec<Edit>) -> Result<String, EditError> {
        let Some(first) = edits.first() else {
            return Ok(content.to_string());
        };
        let file = first.file.clone();

        for edit in &edits {
            if edit.file != file {
                return Err(EditError::MixedFiles {
                    expected: file,
                    found: edit.file.clone(),
                });
            }
            edit.validate(content)?;
        }

        let mut ordered: Vec<(usize, Edit)> = edits.into_iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            b.byte_start
                .cmp(&a.byte_start)
                .then(b.byte_end.cmp(&a.byte_end))
                .then(ib.cmp(ia))
        });

        // Sorted descending: for non-overlapping regions, earlier.end <= later.start
        for window in ordered.windows(2) {
            let (later, earlier) = (&window[0].1, &window[1].1);
            if earlier.byte_end > later.byte_start {
                return Err(EditError::Overlapping {
                    file,
                    first_start: earlier.byte_start,
                    first_end: earlier.byte_end,
                    second_start: later.byte_start,
                    second_end: later.byte_end,
                });
            }
        }

        let mut new_content = content.to_string();
        for (_, edit) in &ordered {
            new_content.replace_range(edit.byte_start..edit.byte_end, &edit.new_text);
        }

        Ok(new_content)
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes. The file's mtime is
/// refreshed afterwards so watchers and incremental compilers notice it.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;
    Ok(())
}
