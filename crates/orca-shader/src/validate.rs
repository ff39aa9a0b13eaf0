//! Pre-flight checks run before any rewriting.
//!
//! The brace check is intentionally coarse: it only requires that at least one `{` and one `}`
//! appear somewhere in the source. It is not a balanced-brace parse.

use crate::error::TranspileError;

pub fn validate(source: &str) -> Result<(), TranspileError> {
    if source.is_empty() {
        return Err(TranspileError::EmptyInput);
    }
    if !source.contains('{') || !source.contains('}') {
        return Err(TranspileError::MalformedBraces);
    }
    Ok(())
}
