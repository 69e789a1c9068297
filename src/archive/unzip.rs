//! Zip branch: unpack archive entries into the target directory.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::pipeline::types::{ExtractionResult, Stage, StagedFile};
use crate::storage::{FileWriter, safe_file_name};

/// Unpack every file entry of the zip at `path` through `writer`.
///
/// Entries are written under their final name component. Directory entries,
/// names that would leave the target directory and names already written
/// from this archive are skipped.
pub fn extract_zip(path: &Path, writer: &FileWriter) -> Result<Vec<StagedFile>> {
    let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut archive =
        zip::ZipArchive::new(BufReader::new(file)).map_err(|e| ExtractError::archive(path, e))?;

    let mut written = Vec::with_capacity(archive.len());
    let mut seen = HashSet::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ExtractError::archive(path, e))?;

        if entry.is_dir() {
            continue;
        }

        let Some(name) = safe_file_name(entry.name()) else {
            warn!(
                archive = %path.display(),
                entry = %entry.name(),
                "Skipping zip entry with unsafe name"
            );
            continue;
        };

        if !seen.insert(name.clone()) {
            warn!(
                archive = %path.display(),
                entry = %entry.name(),
                name = %name,
                "Skipping zip entry that flattens onto an earlier one"
            );
            continue;
        }

        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| ExtractError::archive(path, e))?;

        written.push(writer.write(&name, &content)?);
    }

    Ok(written)
}

/// Zip branch of the pipeline. Every extracted entry is accepted.
#[derive(Debug, Clone)]
pub struct ZipExtractor {
    writer: FileWriter,
}

impl ZipExtractor {
    pub fn new(writer: FileWriter) -> Self {
        Self { writer }
    }
}

impl Stage for ZipExtractor {
    fn name(&self) -> &str {
        "zip_extract"
    }

    fn process(&self, input: &Path, sink: &mut ExtractionResult) -> Result<()> {
        debug!(path = %input.display(), "Extracting zip archive");
        for staged in extract_zip(input, &self.writer)? {
            sink.push(staged.into_path());
        }
        Ok(())
    }
}
