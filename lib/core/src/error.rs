//! Error handling foundation for the revu identity crates.
//!
//! This module provides the `Result` type alias using rootcause and the
//! `StoreError` raised by backing-store collaborators. Each crate defines
//! its own domain-specific error types in their own error modules, using
//! rootcause's `.context()` to add layer-appropriate context as errors
//! propagate up the stack.

use rootcause::Report;
use std::fmt;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context via `.context()` as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// Errors raised by the backing store that holds accounts and groups.
///
/// "Not found" is never a `StoreError`: stores answer `None` for missing
/// entities and the caches decide how to surface that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached.
    Unavailable { reason: String },
    /// A stored entity could not be decoded.
    Corrupt { entity: String, reason: String },
    /// The store refused a write.
    Rejected { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => {
                write!(f, "identity store unavailable: {reason}")
            }
            Self::Corrupt { entity, reason } => {
                write!(f, "corrupt record for {entity}: {reason}")
            }
            Self::Rejected { reason } => {
                write!(f, "identity store rejected write: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}
