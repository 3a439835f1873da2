//! Error types for the access crate.
//!
//! A group the caller may not see is reported exactly like a group that
//! does not exist, so callers cannot tell hidden groups from missing ones.

use std::fmt;

/// Errors from group access checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// The group does not exist or is not visible to the caller.
    NoSuchGroup { group: String },
    /// Resolving the group or the caller's memberships failed.
    LookupFailed { group: String },
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchGroup { group } => {
                write!(f, "no such group: {group}")
            }
            Self::LookupFailed { group } => {
                write!(f, "failed to look up group {group}")
            }
        }
    }
}

impl std::error::Error for GroupError {}
