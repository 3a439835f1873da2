//! Group membership for the revu code-review server.
//!
//! This crate answers "does this identity belong to these groups?":
//!
//! - **Capability**: [`GroupMembership`], a closed set of membership views
//! - **Explicit sets**: [`ListGroupMembership`] and
//!   [`FilterableListGroupMembership`], answered without any lookups
//! - **Transitive closure**: [`MaterializedGroupMembership`], which walks
//!   the group inclusion graph lazily through a [`GroupIncludeIndex`]
//!
//! # Example
//!
//! ```
//! use revu_core::GroupUuid;
//! use revu_membership::GroupMembership;
//!
//! # async fn example() -> revu_core::Result<(), revu_core::StoreError> {
//! let admins = GroupUuid::parse("admins").expect("valid uuid");
//! let mut membership = GroupMembership::list([admins.clone()]);
//! assert!(membership.contains(&admins).await?);
//! # Ok(())
//! # }
//! ```

pub mod index;
pub mod list;
pub mod materialized;
pub mod membership;

#[cfg(test)]
pub(crate) mod testing;

pub use index::GroupIncludeIndex;
pub use list::{FilterableListGroupMembership, ListGroupMembership, MemberPredicate};
pub use materialized::MaterializedGroupMembership;
pub use membership::GroupMembership;
