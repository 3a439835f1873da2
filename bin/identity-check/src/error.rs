//! Errors of the identity check tool.

use std::fmt;

/// Identity check failures.
#[derive(Debug)]
pub enum CheckError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// Neither the command line nor the configuration names a fixture.
    NoFixture,
    /// The fixture could not be read or parsed.
    Fixture { path: String, details: String },
    /// A query failed.
    Query { details: String },
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::NoFixture => write!(f, "no fixture given; pass --fixture or set REVU__FIXTURE"),
            Self::Fixture { path, details } => {
                write!(f, "failed to load fixture '{path}': {details}")
            }
            Self::Query { details } => write!(f, "query failed: {details}"),
        }
    }
}

impl std::error::Error for CheckError {}
