//! Shared types for the extraction pipeline.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;

// ── Attachment candidate ────────────────────────────────────────────

/// A MIME part accepted by the attachment filter, with a recovered name.
///
/// Lives only until the file writer has put it on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentCandidate {
    /// File name recovered from the `Content-Disposition` header.
    pub name: String,
    /// Transfer-decoded payload bytes.
    pub content: Vec<u8>,
    /// Lowercase `type/subtype` of the part.
    pub content_type: String,
    /// Unfolded `Content-Disposition` header value.
    pub disposition: String,
}

// ── Staged file ─────────────────────────────────────────────────────

/// A candidate or archive entry that has been written into the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

impl AsRef<Path> for StagedFile {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

// ── Extraction result ───────────────────────────────────────────────

/// Ordered paths of the documents produced by one extraction run.
///
/// Created fresh for every run and handed back to the caller, so no state
/// leaks between runs of the same extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractionResult {
    paths: Vec<PathBuf>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted document.
    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }
}

impl<'a> IntoIterator for &'a ExtractionResult {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

// ── Stage trait ─────────────────────────────────────────────────────

/// One step of the pipeline that consumes a staged path.
///
/// Stages push accepted documents into `sink` and return `Ok(())` when they
/// reject input quietly. Errors abort the current run.
pub trait Stage: Send + Sync {
    /// Stage name (for logging).
    fn name(&self) -> &str;

    fn process(&self, input: &Path, sink: &mut ExtractionResult) -> Result<()>;
}

/// Runs several stages over the same input, in order.
pub struct StageSequence {
    name: String,
    stages: Vec<Box<dyn Stage>>,
}

impl StageSequence {
    pub fn new(name: impl Into<String>, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }
}

impl Stage for StageSequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, input: &Path, sink: &mut ExtractionResult) -> Result<()> {
        for stage in &self.stages {
            stage.process(input, sink)?;
        }
        Ok(())
    }
}
