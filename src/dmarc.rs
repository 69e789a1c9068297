//! Shallow structural check for DMARC aggregate reports.
//!
//! Only checks that the document root has a `report_metadata` child with a
//! non-blank `org_name`. Full schema validation is left to the report renderer.

use crate::error::ValidationError;

const REPORT_METADATA: &str = "report_metadata";
const ORG_NAME: &str = "org_name";

/// Check that `content` looks like a DMARC aggregate report.
pub fn validate_report(content: &[u8]) -> Result<(), ValidationError> {
    let text = std::str::from_utf8(content)?;
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, options)?;

    let metadata = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name(REPORT_METADATA))
        .ok_or(ValidationError::MissingElement(REPORT_METADATA))?;

    let org_name = metadata
        .children()
        .find(|n| n.has_tag_name(ORG_NAME))
        .ok_or(ValidationError::MissingElement(ORG_NAME))?;

    // Comments and CDATA may split the name into several text nodes.
    let name: String = org_name
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();

    if name.trim().is_empty() {
        return Err(ValidationError::EmptyOrgName);
    }
    Ok(())
}

/// Boolean form of [`validate_report`].
pub fn is_dmarc_report(content: &[u8]) -> bool {
    validate_report(content).is_ok()
}
