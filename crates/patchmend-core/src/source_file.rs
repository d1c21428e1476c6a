//! Narrow read/write port onto the target file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::Result;

/// The single file a run patches. Content moves in and out as values.
pub trait SourceFile: Send + Sync {
    fn path(&self) -> &Path;

    /// Read the whole file as UTF-8.
    fn read(&self) -> Result<String>;

    /// Replace the whole file.
    fn write(&self, content: &str) -> Result<()>;
}

/// Filesystem-backed target with atomic replacement.
#[derive(Debug, Clone)]
pub struct FsSourceFile {
    path: PathBuf,
}

impl FsSourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceFile for FsSourceFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    fn write(&self, content: &str) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        // Atomic write: write to temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        if let Ok(meta) = fs::metadata(&self.path) {
            fs::set_permissions(tmp.path(), meta.permissions())?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
