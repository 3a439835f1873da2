//! Request-scoped account and group views for the revu code-review server.
//!
//! [`IdentityService`] is the entry point. Per request it hands out batch
//! factories that resolve each account or group at most once:
//!
//! - [`AccountInfoCacheFactory`] and [`GroupInfoCacheFactory`] collect
//!   summaries for a response
//! - [`GroupMembersFactory`] lists the accounts a group grants membership
//!   to, following group inclusion
//! - [`GroupDetailFactory`] builds the [`GroupDetail`] of one group
//!
//! Groups the caller may not see are reported as
//! [`DirectoryError::NoSuchGroup`], exactly like groups that do not exist.

pub mod account_info;
pub mod error;
pub mod group_detail;
pub mod group_info;
pub mod group_members;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use account_info::{AccountInfo, AccountInfoCacheFactory};
pub use error::DirectoryError;
pub use group_detail::{GroupDetail, GroupDetailFactory};
pub use group_info::{GroupInfo, GroupInfoCacheFactory};
pub use group_members::GroupMembersFactory;
pub use service::IdentityService;
