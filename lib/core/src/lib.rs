//! Core identity types and utilities for the revu code-review server.
//!
//! This crate provides the identity keys for accounts and groups and the
//! error handling foundation shared by the account and group crates.

pub mod error;
pub mod id;

pub use error::{Result, StoreError};
pub use id::{AccountId, GroupId, GroupUuid, ParseIdError};
