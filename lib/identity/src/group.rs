//! Group records.

use chrono::{DateTime, Utc};
use revu_core::{AccountId, GroupId, GroupUuid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// A group stored by the internal group backend.
///
/// Holds direct members and direct subgroups only; transitive membership
/// is resolved by `revu_membership`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalGroup {
    pub(crate) id: GroupId,
    pub(crate) uuid: GroupUuid,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    pub(crate) owner_group_uuid: GroupUuid,
    #[serde(default)]
    pub(crate) visible_to_all: bool,
    #[serde(default)]
    pub(crate) members: BTreeSet<AccountId>,
    #[serde(default)]
    pub(crate) subgroups: BTreeSet<GroupUuid>,
    #[serde(default = "Utc::now")]
    pub(crate) created_on: DateTime<Utc>,
}

impl InternalGroup {
    /// Creates a group that owns itself and has no members.
    #[must_use]
    pub fn new(id: GroupId, uuid: GroupUuid, name: impl Into<String>) -> Self {
        Self {
            id,
            owner_group_uuid: uuid.clone(),
            uuid,
            name: name.into(),
            description: None,
            visible_to_all: false,
            members: BTreeSet::new(),
            subgroups: BTreeSet::new(),
            created_on: Utc::now(),
        }
    }

    /// Sets the group whose members own this group.
    #[must_use]
    pub fn with_owner(mut self, owner: GroupUuid) -> Self {
        self.owner_group_uuid = owner;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the visible-to-all flag.
    #[must_use]
    pub fn with_visible_to_all(mut self, visible_to_all: bool) -> Self {
        self.visible_to_all = visible_to_all;
        self
    }

    /// Sets the direct members.
    #[must_use]
    pub fn with_members(mut self, members: impl IntoIterator<Item = AccountId>) -> Self {
        self.members = members.into_iter().collect();
        self
    }

    /// Sets the direct subgroups.
    #[must_use]
    pub fn with_subgroups(mut self, subgroups: impl IntoIterator<Item = GroupUuid>) -> Self {
        self.subgroups = subgroups.into_iter().collect();
        self
    }

    /// Returns the group ID.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Returns the group UUID.
    #[must_use]
    pub fn uuid(&self) -> &GroupUuid {
        &self.uuid
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, if set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the UUID of the group whose members own this group.
    #[must_use]
    pub fn owner_group_uuid(&self) -> &GroupUuid {
        &self.owner_group_uuid
    }

    /// Returns the persisted visible-to-all flag.
    #[must_use]
    pub fn is_visible_to_all(&self) -> bool {
        self.visible_to_all
    }

    /// Returns the direct members.
    #[must_use]
    pub fn members(&self) -> &BTreeSet<AccountId> {
        &self.members
    }

    /// Returns the direct subgroups.
    #[must_use]
    pub fn subgroups(&self) -> &BTreeSet<GroupUuid> {
        &self.subgroups
    }

    /// Returns when the group was created.
    #[must_use]
    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }
}

/// A group of any backend: internal, system or external.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescription {
    uuid: GroupUuid,
    name: String,
    group: Option<Arc<InternalGroup>>,
}

impl GroupDescription {
    /// Describes an internal group.
    #[must_use]
    pub fn internal(group: Arc<InternalGroup>) -> Self {
        Self {
            uuid: group.uuid().clone(),
            name: group.name().to_string(),
            group: Some(group),
        }
    }

    /// Describes a group that has no internal record.
    #[must_use]
    pub fn external(uuid: GroupUuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            group: None,
        }
    }

    /// Describes a uuid that no backend could resolve. The name falls
    /// back to the uuid.
    #[must_use]
    pub fn unresolved(uuid: GroupUuid) -> Self {
        let name = uuid.to_string();
        Self::external(uuid, name)
    }

    /// Returns the group UUID.
    #[must_use]
    pub fn uuid(&self) -> &GroupUuid {
        &self.uuid
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the internal record, if the group has one.
    #[must_use]
    pub fn internal_group(&self) -> Option<&Arc<InternalGroup>> {
        self.group.as_ref()
    }

    /// Returns true if the uuid names an internal group the store no
    /// longer has.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.uuid.is_internal() && self.group.is_none()
    }
}

/// A group's uuid and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupReference {
    /// Group UUID.
    pub uuid: GroupUuid,
    /// Group name.
    pub name: String,
}

impl From<&InternalGroup> for GroupReference {
    fn from(group: &InternalGroup) -> Self {
        Self {
            uuid: group.uuid().clone(),
            name: group.name().to_string(),
        }
    }
}

/// Key a group can be looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Internal integer id.
    Id(GroupId),
    /// Stable uuid.
    Uuid(GroupUuid),
    /// Unique name.
    Name(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "group id {id}"),
            Self::Uuid(uuid) => write!(f, "group uuid {uuid}"),
            Self::Name(name) => write!(f, "group name {name:?}"),
        }
    }
}
