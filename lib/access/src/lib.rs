//! Access control for the revu code-review server.
//!
//! This crate decides what the user behind a request may do:
//!
//! - **Users**: [`CurrentUser`] and its effective groups, built by a
//!   [`CurrentUserFactory`]
//! - **Capabilities**: server-wide [`GlobalCapability`]s granted to groups
//!   through a [`CapabilityPolicy`]
//! - **Groups**: [`GroupControl`], the per-group permissions of a user
//!
//! # Access Control Model
//!
//! A user owns a group when one of its effective groups is the group's
//! owner group, or when it administers the server. Owners may see the
//! group, list its members and change its membership; nobody else may.
//! Groups a user cannot see are reported as missing.

pub mod capability;
pub mod control;
pub mod error;
pub mod user;

pub use capability::{CapabilityConfig, CapabilityPolicy, GlobalCapability};
pub use control::{GroupControl, GroupControlFactory};
pub use error::GroupError;
pub use user::{CurrentUser, CurrentUserFactory, UserKind};
