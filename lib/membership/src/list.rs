//! Pre-materialized membership sets.

use revu_core::GroupUuid;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// Membership over an explicit, closed set of groups.
///
/// No inclusion edges are followed: a group is a member exactly when it is
/// in the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListGroupMembership {
    groups: HashSet<GroupUuid>,
}

impl ListGroupMembership {
    /// Creates a membership over the given groups.
    #[must_use]
    pub fn new(groups: impl IntoIterator<Item = GroupUuid>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
        }
    }

    /// Creates a membership with no groups.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if `group` is in the set.
    #[must_use]
    pub fn contains(&self, group: &GroupUuid) -> bool {
        self.groups.contains(group)
    }

    /// Returns true if any of `groups` is in the set.
    pub fn contains_any_of<'a>(&self, groups: impl IntoIterator<Item = &'a GroupUuid>) -> bool {
        groups.into_iter().any(|g| self.groups.contains(g))
    }

    /// Returns every group in the set.
    #[must_use]
    pub fn known_groups(&self) -> BTreeSet<GroupUuid> {
        self.groups.iter().cloned().collect()
    }

    /// Returns the number of groups in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if the set has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Predicate deciding whether a listed group is still a valid member.
pub type MemberPredicate = Arc<dyn Fn(&GroupUuid) -> bool + Send + Sync>;

/// Membership over an explicit set, filtered by an external predicate.
///
/// Used when the set was captured earlier (e.g. from an external directory)
/// and some of its entries may have gone stale since. Groups rejected by
/// the predicate are treated as if they were never listed.
#[derive(Clone)]
pub struct FilterableListGroupMembership {
    groups: HashSet<GroupUuid>,
    still_valid: MemberPredicate,
}

impl FilterableListGroupMembership {
    /// Creates a filtered membership over the given groups.
    #[must_use]
    pub fn new(groups: impl IntoIterator<Item = GroupUuid>, still_valid: MemberPredicate) -> Self {
        Self {
            groups: groups.into_iter().collect(),
            still_valid,
        }
    }

    /// Returns true if `group` is listed and still valid.
    #[must_use]
    pub fn contains(&self, group: &GroupUuid) -> bool {
        self.groups.contains(group) && (self.still_valid)(group)
    }

    /// Returns true if any of `groups` is listed and still valid.
    pub fn contains_any_of<'a>(&self, groups: impl IntoIterator<Item = &'a GroupUuid>) -> bool {
        groups.into_iter().any(|g| self.contains(g))
    }

    /// Returns every listed group that is still valid.
    #[must_use]
    pub fn known_groups(&self) -> BTreeSet<GroupUuid> {
        self.groups
            .iter()
            .filter(|g| (self.still_valid)(g))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for FilterableListGroupMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterableListGroupMembership")
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}
