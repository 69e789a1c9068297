//! DMARC Extract: pull aggregate reports out of report emails.

pub mod archive;
pub mod config;
pub mod dmarc;
pub mod error;
pub mod mail;
pub mod pipeline;
pub mod storage;

pub use config::ExtractorConfig;
pub use error::{Error, ExtractError};
pub use pipeline::{DmarcExtractor, ExtractionResult, extract};
