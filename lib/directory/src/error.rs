//! Error types for the directory crate.

use revu_access::GroupError;
use rootcause::Report;
use std::fmt;

/// Errors from directory queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The group does not exist or is not visible to the caller.
    NoSuchGroup { group: String },
    /// A cache or store lookup failed.
    LookupFailed { what: String },
}

impl DirectoryError {
    /// Wraps a group access failure, keeping "no such group" recognizable.
    pub(crate) fn from_group(report: Report<GroupError>) -> Report<Self> {
        let context = match report.current_context() {
            GroupError::NoSuchGroup { group } => Self::NoSuchGroup {
                group: group.clone(),
            },
            GroupError::LookupFailed { group } => Self::LookupFailed {
                what: format!("group {group}"),
            },
        };
        report.context(context)
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchGroup { group } => {
                write!(f, "no such group: {group}")
            }
            Self::LookupFailed { what } => {
                write!(f, "failed to look up {what}")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}
