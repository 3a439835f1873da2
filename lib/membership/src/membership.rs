//! The group membership capability.

use crate::index::GroupIncludeIndex;
use crate::list::{FilterableListGroupMembership, ListGroupMembership, MemberPredicate};
use crate::materialized::MaterializedGroupMembership;
use revu_core::{GroupUuid, Result, StoreError};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Answers whether an identity belongs to a group, possibly transitively.
///
/// The variants differ only in where the answer comes from:
/// - `List`: an explicit closed set
/// - `FilterableList`: an explicit set minus members an external predicate
///   no longer accepts
/// - `Materialized`: the transitive closure of a seed set, expanded lazily
///
/// Queries take `&mut self` because the materialized variant memoizes its
/// traversal in place. Only the materialized variant can fail.
#[derive(Debug)]
pub enum GroupMembership {
    /// Explicit closed set of groups.
    List(ListGroupMembership),
    /// Explicit set filtered by a still-valid predicate.
    FilterableList(FilterableListGroupMembership),
    /// Lazily expanded transitive closure.
    Materialized(MaterializedGroupMembership),
}

impl GroupMembership {
    /// Membership in no groups at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::List(ListGroupMembership::empty())
    }

    /// Membership in exactly the given groups.
    #[must_use]
    pub fn list(groups: impl IntoIterator<Item = GroupUuid>) -> Self {
        Self::List(ListGroupMembership::new(groups))
    }

    /// Membership in the given groups that `still_valid` accepts.
    #[must_use]
    pub fn filterable(
        groups: impl IntoIterator<Item = GroupUuid>,
        still_valid: MemberPredicate,
    ) -> Self {
        Self::FilterableList(FilterableListGroupMembership::new(groups, still_valid))
    }

    /// Membership in `seed` and every group that transitively includes it.
    #[must_use]
    pub fn materialized(
        index: Arc<dyn GroupIncludeIndex>,
        seed: impl IntoIterator<Item = GroupUuid>,
    ) -> Self {
        Self::Materialized(MaterializedGroupMembership::new(index, seed))
    }

    /// Returns true if `group` is one of the member's groups.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving inclusions fails.
    pub async fn contains(&mut self, group: &GroupUuid) -> Result<bool, StoreError> {
        match self {
            Self::List(list) => Ok(list.contains(group)),
            Self::FilterableList(list) => Ok(list.contains(group)),
            Self::Materialized(materialized) => materialized.contains(group).await,
        }
    }

    /// Returns true if any of `groups` is one of the member's groups.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving inclusions fails.
    pub async fn contains_any_of<'a, I>(&mut self, groups: I) -> Result<bool, StoreError>
    where
        I: IntoIterator<Item = &'a GroupUuid> + Send,
    {
        match self {
            Self::List(list) => Ok(list.contains_any_of(groups)),
            Self::FilterableList(list) => Ok(list.contains_any_of(groups)),
            Self::Materialized(materialized) => materialized.contains_any_of(groups).await,
        }
    }

    /// Returns every group the member is known to belong to.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving inclusions fails.
    pub async fn known_groups(&mut self) -> Result<BTreeSet<GroupUuid>, StoreError> {
        match self {
            Self::List(list) => Ok(list.known_groups()),
            Self::FilterableList(list) => Ok(list.known_groups()),
            Self::Materialized(materialized) => materialized.known_groups().await,
        }
    }
}

impl From<ListGroupMembership> for GroupMembership {
    fn from(list: ListGroupMembership) -> Self {
        Self::List(list)
    }
}

impl From<FilterableListGroupMembership> for GroupMembership {
    fn from(list: FilterableListGroupMembership) -> Self {
        Self::FilterableList(list)
    }
}

impl From<MaterializedGroupMembership> for GroupMembership {
    fn from(materialized: MaterializedGroupMembership) -> Self {
        Self::Materialized(materialized)
    }
}
