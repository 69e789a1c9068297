//! End-to-end extraction: email file in, report paths out.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::{GzipExtractor, ZipExtractor, ZipRepair};
use crate::config::ExtractorConfig;
use crate::error::{Error, Result};
use crate::mail::{AttachmentFilter, MailDecoder};
use crate::pipeline::router::{ContentRouter, RouteRule, UnroutedPolicy};
use crate::pipeline::types::{ExtractionResult, Stage, StageSequence};
use crate::storage::FileWriter;

/// Routes for DMARC archives: `.zip` is repaired then unpacked, `.gz` is
/// decompressed and validated.
pub fn archive_router(writer: &FileWriter, policy: UnroutedPolicy) -> ContentRouter {
    let zip_stages: Vec<Box<dyn Stage>> = vec![
        Box::new(ZipRepair),
        Box::new(ZipExtractor::new(writer.clone())),
    ];
    let zip = StageSequence::new("zip", zip_stages);

    ContentRouter::new(policy)
        .with_rule(RouteRule::suffix(".zip", zip))
        .with_rule(RouteRule::suffix(".gz", GzipExtractor::new(writer.clone())))
}

/// Decodes an email, stages its attachments and routes each one.
///
/// Holds no per-run state; one extractor can serve many emails, from many
/// threads at once.
#[derive(Debug)]
pub struct DmarcExtractor {
    decoder: MailDecoder,
    writer: FileWriter,
    router: ContentRouter,
}

impl DmarcExtractor {
    /// Default attachment criteria and archive routes, writing into `target_dir`.
    ///
    /// Fails with `DirectoryNotFound` if `target_dir` is not an existing directory.
    pub fn new(target_dir: impl Into<PathBuf>) -> Result<Self> {
        let writer = FileWriter::open(target_dir)?;
        let router = archive_router(&writer, UnroutedPolicy::default());
        Ok(Self::from_parts(MailDecoder::default(), writer, router))
    }

    pub fn from_config(config: &ExtractorConfig) -> std::result::Result<Self, Error> {
        let criteria = config.criteria()?;
        Ok(Self::with_filter(
            &config.target_dir,
            criteria,
            config.unrouted_policy,
        )?)
    }

    /// Custom attachment filter with the default archive routes.
    pub fn with_filter(
        target_dir: impl Into<PathBuf>,
        filter: impl AttachmentFilter + 'static,
        policy: UnroutedPolicy,
    ) -> Result<Self> {
        let writer = FileWriter::open(target_dir)?;
        let router = archive_router(&writer, policy);
        Ok(Self::from_parts(MailDecoder::new(filter), writer, router))
    }

    pub fn from_parts(decoder: MailDecoder, writer: FileWriter, router: ContentRouter) -> Self {
        Self {
            decoder,
            writer,
            router,
        }
    }

    pub fn target_dir(&self) -> &Path {
        self.writer.directory().path()
    }

    pub fn router(&self) -> &ContentRouter {
        &self.router
    }

    /// Register an extra route, checked after the built-in ones.
    pub fn add_route(&mut self, rule: RouteRule) {
        self.router.add_rule(rule);
    }

    /// Run the whole pipeline over one email file.
    ///
    /// Returned paths are in attachment order, then archive entry order.
    /// Staged attachments are left in the target directory.
    pub fn extract(&self, source: &Path) -> Result<ExtractionResult> {
        let candidates = self.decoder.decode_file(source)?;
        debug!(
            source = %source.display(),
            attachments = candidates.len(),
            "Decoded email"
        );

        let mut result = ExtractionResult::new();
        for candidate in &candidates {
            let staged = self.writer.write(&candidate.name, &candidate.content)?;
            self.router.route(staged.path(), &mut result)?;
        }

        info!(
            source = %source.display(),
            attachments = candidates.len(),
            reports = result.len(),
            "Extraction complete"
        );
        Ok(result)
    }
}

/// Extract DMARC reports from the email at `source` into `target_dir`
/// using the default configuration.
pub fn extract(source: impl AsRef<Path>, target_dir: impl Into<PathBuf>) -> Result<Vec<PathBuf>> {
    let extractor = DmarcExtractor::new(target_dir)?;
    Ok(extractor.extract(source.as_ref())?.into_paths())
}
