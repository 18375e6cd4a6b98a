//! On-disk layout: `<root>/<algorithm>/<identifier>.enc`.
//!
//! Block-cipher blobs are `IV || ciphertext`; RC4 blobs are raw ciphertext.

use crate::error::{PipelineError, Result};
use encryption::Algorithm;

pub const BLOB_EXTENSION: &str = "enc";

/// Directory (relative to the storage root) holding one algorithm's blobs.
pub fn algorithm_dir(algorithm: Algorithm) -> &'static str {
    algorithm.tag()
}

/// Relative, `/`-separated path of a blob. Does not validate `identifier`.
pub fn blob_path(algorithm: Algorithm, identifier: &str) -> String {
    format!("{}/{identifier}.{BLOB_EXTENSION}", algorithm_dir(algorithm))
}

/// An identifier becomes a file name, so it must be exactly one path component.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(PipelineError::InvalidIdentifier(
            "identifier must not be empty".into(),
        ));
    }
    if identifier == "."
        || identifier == ".."
        || identifier.contains(['/', '\\', '\0'])
    {
        return Err(PipelineError::InvalidIdentifier(format!(
            "'{}' is not a single path component",
            identifier.escape_debug()
        )));
    }
    Ok(())
}
