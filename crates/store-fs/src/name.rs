//! File name component validation
//!
//! Applies the strictest rules of the major platforms so that a name accepted
//! here can be created anywhere, then adds the store's own convention that
//! components never contain dots.

use std::fmt;

use crate::constants::{INVALID_NAME_CHARS, MAX_NAME_BYTES, RESERVED_DEVICE_NAMES};
use crate::{Error, Result};

/// Why a name component was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameViolation {
    Empty,
    TooLong { len: usize },
    InvalidChar(char),
    ReservedName,
    TrailingSpaceOrDot,
    ContainsDot,
}

impl fmt::Display for NameViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name is empty"),
            Self::TooLong { len } => {
                write!(f, "name is {len} bytes, limit is {MAX_NAME_BYTES}")
            }
            Self::InvalidChar(c) => write!(f, "invalid character {c:?}"),
            Self::ReservedName => write!(f, "reserved device name"),
            Self::TrailingSpaceOrDot => write!(f, "name ends with a space or dot"),
            Self::ContainsDot => write!(f, "component name cannot contain . (dots)"),
        }
    }
}

/// Validate a single path component for use as a file or folder name.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] describing the first violated rule.
pub fn validate_file_name_component(name: &str) -> Result<()> {
    check(name).map_err(|reason| Error::InvalidName {
        name: name.to_string(),
        reason,
    })
}

fn check(name: &str) -> std::result::Result<(), NameViolation> {
    if name.is_empty() {
        return Err(NameViolation::Empty);
    }
    if name.len() > MAX_NAME_BYTES {
        return Err(NameViolation::TooLong { len: name.len() });
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_control() || INVALID_NAME_CHARS.contains(c))
    {
        return Err(NameViolation::InvalidChar(c));
    }
    if name == "." || name == ".." {
        return Err(NameViolation::ReservedName);
    }
    // Windows ignores anything after the first dot when matching device names
    let stem = name.split('.').next().unwrap_or(name).trim_end();
    if RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        return Err(NameViolation::ReservedName);
    }
    if name.ends_with(' ') || name.ends_with('.') {
        return Err(NameViolation::TrailingSpaceOrDot);
    }
    if name.contains('.') {
        return Err(NameViolation::ContainsDot);
    }
    Ok(())
}

/// Return the last component of a path, if any.
pub fn file_name_from_path(path: &str) -> Option<&str> {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
}
