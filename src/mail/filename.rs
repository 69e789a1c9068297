//! File name recovery from `Content-Disposition` headers.

use crate::error::FilenameError;
use crate::storage::safe_file_name;

const FILENAME_KEY: &str = "filename";

/// Pull the attachment name out of a disposition header line.
///
/// Takes everything from the first alphabetic character after `filename`
/// through the last alphabetic character of the line, which strips `="`,
/// quotes and trailing punctuation. Leading digits of a name are lost too.
pub fn extract_filename(line: &str) -> Result<String, FilenameError> {
    let key_at = line.find(FILENAME_KEY).ok_or(FilenameError::MissingKey)?;
    let after_key = key_at + FILENAME_KEY.len();

    let start = line[after_key..]
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(i, _)| after_key + i)
        .ok_or(FilenameError::Empty)?;

    // Cannot fail: the character at `start` is alphabetic.
    let end = line
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(i, c)| i + c.len_utf8())
        .ok_or(FilenameError::Empty)?;

    Ok(line[start..end].to_string())
}

/// [`extract_filename`] reduced to a name that is safe to write.
pub fn recover_filename(line: &str) -> Result<String, FilenameError> {
    let name = extract_filename(line)?;
    safe_file_name(&name).ok_or(FilenameError::Unsafe(name))
}
