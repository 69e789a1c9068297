//! DMARC extraction pipeline.
//!
//! Every email file flows through:
//! 1. `MailDecoder::decode_file()`: MIME walk, attachment filter, file name recovery
//! 2. `FileWriter::write()`: each candidate is staged in the target directory
//! 3. `ContentRouter::route()`: the staged path goes to the first matching stage
//! 4. Archive stages push validated report paths into the run's `ExtractionResult`
//!
//! **Each run owns its result.** Nothing is shared between calls to `extract`.

pub mod orchestrator;
pub mod router;
pub mod types;

pub use orchestrator::{DmarcExtractor, archive_router, extract};
pub use router::{ContentRouter, RouteRule, UnroutedPolicy};
pub use types::{AttachmentCandidate, ExtractionResult, Stage, StageSequence, StagedFile};
