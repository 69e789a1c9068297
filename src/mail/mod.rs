//! Mail decoding: MIME walking, attachment filtering, file name recovery.

pub mod decoder;
pub mod filename;
pub mod filter;

pub use decoder::MailDecoder;
pub use filename::{extract_filename, recover_filename};
pub use filter::{AttachmentCriteria, AttachmentFilter};
