//! Gzip branch: decompress, validate and name DMARC report documents.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use tracing::debug;

use crate::dmarc::validate_report;
use crate::error::{ExtractError, Result};
use crate::pipeline::types::{ExtractionResult, Stage};
use crate::storage::FileWriter;

const XML_SUFFIX: &str = ".xml";

/// Decompress a single-stream gzip file into memory.
pub fn decompress_gzip(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut content = Vec::new();
    decoder
        .read_to_end(&mut content)
        .map_err(|e| ExtractError::archive(path, e))?;
    Ok(content)
}

/// Name of the document inside a gzip archive called `archive_name`.
///
/// The last dot segment is dropped (`a.xml.gz` → `a.xml`). Names without
/// any dot get a UTC timestamp name instead. The result always ends in
/// `.xml`: a known file-type extension is swapped (`report.csv` →
/// `report.xml`), anything else gets `.xml` appended.
pub fn derive_xml_name(archive_name: &str, now: DateTime<Utc>) -> String {
    let name = match archive_name.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => timestamp_name(now),
    };

    if name.ends_with(XML_SUFFIX) {
        return name;
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && is_type_extension(ext) => {
            format!("{stem}{XML_SUFFIX}")
        }
        _ => format!("{name}{XML_SUFFIX}"),
    }
}

fn timestamp_name(now: DateTime<Utc>) -> String {
    now.format("%Y_%m_%d_%H_%M_%S_%6f").to_string()
}

/// File-type extensions that are replaced by `.xml`, in any case.
const TYPE_EXTENSIONS: &[&str] = &["csv", "txt", "json", "xml"];

fn is_type_extension(ext: &str) -> bool {
    TYPE_EXTENSIONS.iter().any(|t| t.eq_ignore_ascii_case(ext))
}

/// Gzip branch of the pipeline.
///
/// Only payloads that pass the DMARC check are written. Anything else is
/// dropped without an error.
#[derive(Debug, Clone)]
pub struct GzipExtractor {
    writer: FileWriter,
}

impl GzipExtractor {
    pub fn new(writer: FileWriter) -> Self {
        Self { writer }
    }
}

impl Stage for GzipExtractor {
    fn name(&self) -> &str {
        "gzip_extract"
    }

    fn process(&self, input: &Path, sink: &mut ExtractionResult) -> Result<()> {
        debug!(path = %input.display(), "Decompressing gzip archive");
        let content = decompress_gzip(input)?;

        if let Err(reason) = validate_report(&content) {
            debug!(path = %input.display(), %reason, "Not a DMARC report, dropping");
            return Ok(());
        }

        let archive_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = derive_xml_name(&archive_name, Utc::now());

        let staged = self.writer.write(&name, &content)?;
        sink.push(staged.into_path());
        Ok(())
    }
}
