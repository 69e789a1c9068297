//! Archive stages: zip repair, zip extraction, gzip extraction.
//!
//! All three implement [`Stage`](crate::pipeline::types::Stage) and operate
//! on files already staged in the target directory.

pub mod gunzip;
pub mod repair;
pub mod unzip;

pub use gunzip::{GzipExtractor, decompress_gzip, derive_xml_name};
pub use repair::{RepairOutcome, ZipRepair, repair_zip};
pub use unzip::{ZipExtractor, extract_zip};
