//! Target directory guard and file writer.
//!
//! Every file the pipeline produces goes through [`FileWriter::write`], which
//! only accepts bare file names. Names coming from mail headers or archive
//! entries are first reduced with [`safe_file_name`].

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::pipeline::types::StagedFile;

/// Reduce an untrusted name to a single file name component.
///
/// Backslashes are treated as separators. Returns `None` when the name has a
/// parent-directory, root or drive segment, or no normal component at all.
/// Otherwise returns the final component (`reports/a.xml` → `a.xml`).
pub fn safe_file_name(name: &str) -> Option<String> {
    let normalized = name.replace('\\', "/");
    let mut last = None;

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => last = Some(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    last.and_then(|part| part.to_str()).map(str::to_string)
}

// ── Target directory ────────────────────────────────────────────────

/// An output directory that was verified to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDirectory {
    path: PathBuf,
}

impl TargetDirectory {
    /// Validate that `path` exists and is a directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(ExtractError::DirectoryNotFound(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ── File writer ─────────────────────────────────────────────────────

/// Writes named byte buffers into a [`TargetDirectory`].
#[derive(Debug, Clone)]
pub struct FileWriter {
    dir: TargetDirectory,
}

impl FileWriter {
    pub fn new(dir: TargetDirectory) -> Self {
        Self { dir }
    }

    /// Shorthand for `FileWriter::new(TargetDirectory::open(path)?)`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(TargetDirectory::open(path)?))
    }

    pub fn directory(&self) -> &TargetDirectory {
        &self.dir
    }

    /// Create or truncate `<dir>/<name>` and fill it with `content`.
    pub fn write(&self, name: &str, content: &[u8]) -> Result<StagedFile> {
        if safe_file_name(name).as_deref() != Some(name) {
            return Err(ExtractError::UnsafeFileName {
                name: name.to_string(),
            });
        }

        let path = self.dir.path().join(name);
        std::fs::write(&path, content).map_err(|e| ExtractError::io(&path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "Wrote file");

        Ok(StagedFile::new(path))
    }
}
