//! Absolute path handling
//!
//! Paths into the tree are absolute, slash-delimited, Unix-style. The
//! literal root path `/` collapses to the empty string internally so that
//! concatenation (`full_path` + relative path) never double-slashes.
//! Keyed children are addressed by appending `/<key>` to their parent's
//! path.

use crate::error::{Error, Result};

/// Normalize a path for internal concatenation
///
/// The literal root `/` becomes the empty string; all other paths pass
/// through unchanged.
pub fn normalize(path: &str) -> &str {
    if path == "/" {
        ""
    } else {
        path
    }
}

/// Validate a caller-supplied relative path
///
/// Every proxy operation rejects a path that does not start with `/`
/// before touching the tree.
pub fn validate(path: &str) -> Result<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(Error::invalid_path(path))
    }
}

/// Validate an already-normalized absolute path
///
/// After [`normalize`] the root is the empty string, so both `""` and
/// leading-`/` forms are accepted; anything else is malformed.
pub fn validate_normalized(path: &str) -> Result<()> {
    if path.is_empty() || path.starts_with('/') {
        Ok(())
    } else {
        Err(Error::invalid_path(path))
    }
}

/// Join a normalized base with a caller-supplied relative path
///
/// `base` must already be normalized (root as empty string). The relative
/// path is normalized before concatenation.
pub fn join(base: &str, relative: &str) -> String {
    let mut joined = String::with_capacity(base.len() + relative.len());
    joined.push_str(base);
    joined.push_str(normalize(relative));
    joined
}

/// Split an absolute path into its segments
///
/// Empty segments (the leading slash, a trailing slash, the root path
/// itself) are dropped, so the root resolves to zero segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
