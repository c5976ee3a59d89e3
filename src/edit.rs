use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The whole-file primitive every patch job runs through.
///
/// A `SourceFile` is read once, transformed in memory, and either committed
/// in full or dropped. There is no partial write path: `commit` replaces the
/// file atomically or fails without touching it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "SourceFile does nothing until commit() is called"]
pub struct SourceFile {
    /// Path the text was read from and will be written back to
    path: PathBuf,
    /// xxh3 of the text as it was on disk when read
    fingerprint: u64,
    /// Original text, kept for diffing and change detection
    original: String,
    /// Current in-memory text
    text: String,
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("File I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8: {source}")]
    Utf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("{0} changed on disk since it was read; refusing to overwrite")]
    ConcurrentModification(PathBuf),
}

impl EditError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        EditError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of committing a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "CommitResult should be checked for written/unchanged"]
pub enum CommitResult {
    /// New content was written
    Written { file: PathBuf, bytes: usize },
    /// In-memory text equals the original, nothing was written
    Unchanged { file: PathBuf },
}

impl SourceFile {
    /// Read a file in full. Non-UTF-8 content is rejected.
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, EditError> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|e| EditError::io(&path, e))?;
        let original = String::from_utf8(bytes).map_err(|source| EditError::Utf8 {
            path: path.clone(),
            source,
        })?;
        Ok(Self::from_text(path, original))
    }

    /// Wrap text that did not come from disk (check mode, tests).
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let original = text.into();
        Self {
            path: path.into(),
            fingerprint: xxh3_64(original.as_bytes()),
            text: original.clone(),
            original,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the in-memory text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Throw away in-memory edits.
    pub fn discard(&mut self) {
        self.text.clone_from(&self.original);
    }

    pub fn is_modified(&self) -> bool {
        self.text != self.original
    }

    /// Write the current text back atomically if it differs from what was read.
    ///
    /// The file is re-read first; if its content no longer matches the
    /// fingerprint taken at read time the write is refused.
    pub fn commit(&self) -> Result<CommitResult, EditError> {
        if !self.is_modified() {
            return Ok(CommitResult::Unchanged {
                file: self.path.clone(),
            });
        }

        let on_disk = fs::read(&self.path).map_err(|e| EditError::io(&self.path, e))?;
        if xxh3_64(&on_disk) != self.fingerprint {
            return Err(EditError::ConcurrentModification(self.path.clone()));
        }

        atomic_write(&self.path, self.text.as_bytes())?;

        // Bump mtime so dev-server watchers pick the change up
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(&self.path, now).map_err(|e| EditError::io(&self.path, e))?;

        Ok(CommitResult::Written {
            file: self.path.clone(),
            bytes: self.text.len(),
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write lands or the original file is left as it was.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Tempfile must live on the same filesystem for rename to be atomic
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| EditError::io(path, e))?;
    temp.write_all(content).map_err(|e| EditError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| EditError::io(path, e))?;

    // Keep the original permissions; NamedTempFile is created 0600
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(temp.path(), meta.permissions()).map_err(|e| EditError::io(path, e))?;
    }

    temp.persist(path).map_err(|e| EditError::io(path, e.error))?;

    Ok(())
}
