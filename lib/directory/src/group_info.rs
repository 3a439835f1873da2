//! Request-scoped batch resolution of group summaries.

use crate::error::DirectoryError;
use chrono::{DateTime, Utc};
use revu_core::{GroupId, GroupUuid, Result};
use revu_identity::{GroupCache, GroupDescription};
use rootcause::prelude::ResultExt;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Public summary of a group of any backend.
///
/// Fields only internal groups have are absent for system, external and
/// stale groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    /// Group uuid.
    pub uuid: GroupUuid,
    /// Group name.
    pub name: String,
    /// Internal id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<GroupId>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Uuid of the owner group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_group_uuid: Option<GroupUuid>,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
}

impl From<&GroupDescription> for GroupInfo {
    fn from(description: &GroupDescription) -> Self {
        let group = description.internal_group();
        Self {
            uuid: description.uuid().clone(),
            name: description.name().to_string(),
            id: group.map(|g| g.id()),
            description: group.and_then(|g| g.description()).map(str::to_string),
            owner_group_uuid: group.map(|g| g.owner_group_uuid().clone()),
            created_on: group.map(|g| g.created_on()),
        }
    }
}

/// Collects [`GroupInfo`]s for one response.
///
/// Each group is resolved at most once, however often it is asked for.
/// [`create`](Self::create) lists groups in the order they were first
/// asked for.
#[derive(Debug)]
pub struct GroupInfoCacheFactory<'a> {
    groups: &'a GroupCache,
    index: HashMap<GroupUuid, usize>,
    infos: Vec<GroupInfo>,
}

impl<'a> GroupInfoCacheFactory<'a> {
    /// Creates an empty factory resolving through `groups`.
    #[must_use]
    pub fn new(groups: &'a GroupCache) -> Self {
        Self {
            groups,
            index: HashMap::new(),
            infos: Vec::new(),
        }
    }

    /// Resolves `uuid` unless it already was.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the group fails.
    pub async fn want(&mut self, uuid: &GroupUuid) -> Result<(), DirectoryError> {
        self.resolve(uuid).await.map(|_| ())
    }

    /// Resolves `uuid` unless it already was, and returns its summary.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the group fails.
    pub async fn get(&mut self, uuid: &GroupUuid) -> Result<GroupInfo, DirectoryError> {
        let position = self.resolve(uuid).await?;
        Ok(self.infos[position].clone())
    }

    /// Returns every resolved summary, in first-asked order.
    #[must_use]
    pub fn create(&self) -> Vec<GroupInfo> {
        self.infos.clone()
    }

    async fn resolve(&mut self, uuid: &GroupUuid) -> Result<usize, DirectoryError> {
        if let Some(position) = self.index.get(uuid) {
            return Ok(*position);
        }
        let description = self.groups.describe(uuid).await.context(DirectoryError::LookupFailed {
            what: format!("group {uuid}"),
        })?;
        let position = match self.index.entry(uuid.clone()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                self.infos.push(GroupInfo::from(&description));
                *entry.insert(self.infos.len() - 1)
            }
        };
        Ok(position)
    }
}
