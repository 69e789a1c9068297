//! In-place repair of zip files with a damaged end-of-central-directory tail.
//!
//! Some reporters append garbage after the end-of-central-directory (EOCD)
//! record, or write a comment length that doesn't match the bytes present.
//! The zip reader refuses both. The patch cuts the file right after the fixed
//! EOCD fields and writes a zero comment length.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::pipeline::types::{ExtractionResult, Stage};

/// `PK\x05\x06`
pub const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

/// Offset of the comment-length field from the start of the EOCD record.
const COMMENT_LENGTH_OFFSET: u64 = 20;

/// What [`repair_zip`] did to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// EOCD found at `offset`; the tail was rewritten.
    Patched { offset: u64 },
    /// No usable EOCD signature; file left as is.
    Untouched,
}

/// Offset of the last EOCD signature in `bytes`.
pub fn find_eocd(bytes: &[u8]) -> Option<usize> {
    bytes.windows(EOCD_SIGNATURE.len()).rposition(|w| w == EOCD_SIGNATURE)
}

/// Patch the EOCD tail of the zip file at `path`.
///
/// A signature at offset 0 is not patched: there is no archive in front of it.
pub fn repair_zip(path: &Path) -> Result<RepairOutcome> {
    let io_err = |e| ExtractError::io(path, e);

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(io_err)?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    let offset = match find_eocd(&bytes) {
        Some(pos) if pos > 0 => pos as u64,
        _ => return Ok(RepairOutcome::Untouched),
    };

    // Truncating past the end zero-fills a short record.
    let end = offset + COMMENT_LENGTH_OFFSET;
    file.set_len(end).map_err(io_err)?;
    file.seek(SeekFrom::Start(end)).map_err(io_err)?;
    file.write_all(&[0, 0]).map_err(io_err)?;
    file.flush().map_err(io_err)?;

    Ok(RepairOutcome::Patched { offset })
}

/// Stage wrapper around [`repair_zip`]. Produces no documents.
#[derive(Debug, Clone, Default)]
pub struct ZipRepair;

impl Stage for ZipRepair {
    fn name(&self) -> &str {
        "zip_repair"
    }

    fn process(&self, input: &Path, _sink: &mut ExtractionResult) -> Result<()> {
        let outcome = repair_zip(input)?;
        debug!(path = %input.display(), ?outcome, "Zip repair");
        Ok(())
    }
}
