//! Acceptance rules for MIME parts.

use regex::Regex;

/// Content types of DMARC report archives.
pub const DEFAULT_CONTENT_TYPES: &[&str] = &["application/zip", "application/gzip"];

/// Disposition of a real attachment (as opposed to `inline`).
pub const DEFAULT_DISPOSITION_PATTERN: &str = r"^attachment;";

/// Decides whether a MIME part is an attachment worth extracting.
///
/// `content_type` is the lowercase `type/subtype`; `disposition` is the
/// unfolded `Content-Disposition` value, if the part has one.
pub trait AttachmentFilter: Send + Sync {
    fn accepts(&self, content_type: &str, disposition: Option<&str>) -> bool;
}

impl<F> AttachmentFilter for F
where
    F: Fn(&str, Option<&str>) -> bool + Send + Sync,
{
    fn accepts(&self, content_type: &str, disposition: Option<&str>) -> bool {
        self(content_type, disposition)
    }
}

/// Content-type allowlist plus a disposition regex.
#[derive(Debug, Clone)]
pub struct AttachmentCriteria {
    content_types: Vec<String>,
    disposition: Regex,
}

impl AttachmentCriteria {
    pub fn new<I, S>(content_types: I, disposition_pattern: &str) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            content_types: content_types
                .into_iter()
                .map(|t| t.as_ref().trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            disposition: Regex::new(disposition_pattern)?,
        })
    }

    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    pub fn disposition_pattern(&self) -> &str {
        self.disposition.as_str()
    }
}

impl Default for AttachmentCriteria {
    /// Zip or gzip parts whose disposition starts with `attachment;`.
    fn default() -> Self {
        Self {
            content_types: DEFAULT_CONTENT_TYPES.iter().map(|t| t.to_string()).collect(),
            disposition: Regex::new(DEFAULT_DISPOSITION_PATTERN)
                .expect("default disposition pattern is valid"),
        }
    }
}

impl AttachmentFilter for AttachmentCriteria {
    fn accepts(&self, content_type: &str, disposition: Option<&str>) -> bool {
        self.content_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(content_type))
            && disposition.is_some_and(|d| self.disposition.is_match(d))
    }
}
