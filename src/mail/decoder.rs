//! Raw email → attachment candidates.
//!
//! Parts are visited in MIME order: nested `multipart/*` bodies inline, and
//! the parts of an attached `message/rfc822` right after the part itself.

use std::path::Path;

use mail_parser::{HeaderName, Message, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::mail::filename::recover_filename;
use crate::mail::filter::{AttachmentCriteria, AttachmentFilter};
use crate::pipeline::types::AttachmentCandidate;

/// Content type assumed for parts without a `Content-Type` header.
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Walks the MIME tree of an email and keeps the parts the filter accepts.
pub struct MailDecoder {
    filter: Box<dyn AttachmentFilter>,
}

impl MailDecoder {
    pub fn new(filter: impl AttachmentFilter + 'static) -> Self {
        Self {
            filter: Box::new(filter),
        }
    }

    /// Read and decode the email at `source`.
    ///
    /// Fails with `NoAttachmentFound` when no part survives filtering and
    /// file name recovery.
    pub fn decode_file(&self, source: &Path) -> Result<Vec<AttachmentCandidate>> {
        let raw = std::fs::read(source).map_err(|e| ExtractError::io(source, e))?;
        let candidates = self.scan(&raw);

        if candidates.is_empty() {
            return Err(ExtractError::NoAttachmentFound {
                source_file: source.to_path_buf(),
            });
        }
        Ok(candidates)
    }

    /// Candidates of a raw email, in MIME traversal order.
    ///
    /// Unparseable and single-part messages yield nothing.
    pub fn scan(&self, raw: &[u8]) -> Vec<AttachmentCandidate> {
        let mut candidates = Vec::new();

        let Some(message) = MessageParser::default().parse(raw) else {
            debug!("Message could not be parsed");
            return candidates;
        };

        if !is_multipart(&message) {
            debug!("Message is not multipart");
            return candidates;
        }

        self.walk(&message, message.raw_message(), &mut candidates);
        candidates
    }

    /// `raw` is the buffer the header offsets of `message` point into.
    fn walk(&self, message: &Message<'_>, raw: &[u8], out: &mut Vec<AttachmentCandidate>) {
        for part in &message.parts {
            self.inspect(raw, part, out);

            if let PartType::Message(inner) = &part.body {
                self.walk(inner, offset_base(raw, inner.raw_message()), out);
            }
        }
    }

    fn inspect(&self, raw: &[u8], part: &MessagePart<'_>, out: &mut Vec<AttachmentCandidate>) {
        let content_type = content_type_of(part);
        let disposition = disposition_of(raw, part);

        debug!(
            content_type = %content_type,
            disposition = disposition.as_deref().unwrap_or(""),
            "Inspecting MIME part"
        );

        if !self.filter.accepts(&content_type, disposition.as_deref()) {
            return;
        }

        let disposition = disposition.unwrap_or_default();
        let name = match recover_filename(&disposition) {
            Ok(name) => name,
            Err(reason) => {
                warn!(
                    content_type = %content_type,
                    disposition = %disposition,
                    %reason,
                    "Discarding attachment without usable file name"
                );
                return;
            }
        };

        debug!(name = %name, content_type = %content_type, "Accepted attachment");
        out.push(AttachmentCandidate {
            name,
            content: part.contents().to_vec(),
            content_type,
            disposition,
        });
    }
}

impl std::fmt::Debug for MailDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailDecoder").finish_non_exhaustive()
    }
}

impl Default for MailDecoder {
    fn default() -> Self {
        Self::new(AttachmentCriteria::default())
    }
}

fn is_multipart(message: &Message<'_>) -> bool {
    matches!(
        message.parts.first().map(|p| &p.body),
        Some(PartType::Multipart(_))
    )
}

/// Lowercase `type/subtype`, defaulting to `text/plain`.
fn content_type_of(part: &MessagePart<'_>) -> String {
    match MimeHeaders::content_type(part) {
        Some(ct) => match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub).to_ascii_lowercase(),
            None => ct.ctype().to_ascii_lowercase(),
        },
        None => DEFAULT_CONTENT_TYPE.to_string(),
    }
}

/// Buffer that header offsets of a nested message index.
///
/// A message embedded verbatim borrows from its parent and keeps offsets
/// into the parent's buffer. A transfer-encoded one is parsed from its own
/// decoded buffer.
fn offset_base<'a>(parent: &'a [u8], inner: &'a [u8]) -> &'a [u8] {
    if parent.as_ptr_range().contains(&inner.as_ptr()) {
        parent
    } else {
        inner
    }
}

/// Raw `Content-Disposition` value of `part`, unfolded onto one line.
///
/// Falls back to the parsed header when the raw bytes can't be located.
fn disposition_of(raw: &[u8], part: &MessagePart<'_>) -> Option<String> {
    let header = part
        .headers
        .iter()
        .find(|h| matches!(h.name, HeaderName::ContentDisposition))?;

    raw.get(header.offset_start as usize..header.offset_end as usize)
        .map(|bytes| unfold(&String::from_utf8_lossy(bytes)))
        .filter(|value| value.starts_with(|c: char| c.is_ascii_alphabetic()))
        .or_else(|| parsed_disposition(part))
}

fn parsed_disposition(part: &MessagePart<'_>) -> Option<String> {
    let disposition = part.content_disposition()?;
    Some(match disposition.attribute("filename") {
        Some(name) => format!("{}; filename=\"{name}\"", disposition.ctype()),
        None => format!("{};", disposition.ctype()),
    })
}

fn unfold(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
