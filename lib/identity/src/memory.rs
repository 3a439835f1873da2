//! In-memory identity store.
//!
//! Backs tests and the operator CLI. Inclusion edges are kept in a
//! directed graph (`parent -> subgroup`) so both directions can be
//! answered without scanning every group. Writes return the
//! [`IdentityEvent`] a persistent store would publish; feeding it to a
//! [`CacheEvictor`](crate::event::CacheEvictor) keeps caches coherent.

use crate::account::Account;
use crate::event::IdentityEvent;
use crate::group::{GroupKey, GroupReference, InternalGroup};
use crate::store::IdentityStore;
use async_trait::async_trait;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use revu_core::{AccountId, GroupId, GroupUuid, Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Serializable contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Every account.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Every internal group, with direct members and subgroups.
    #[serde(default)]
    pub groups: Vec<InternalGroup>,
}

/// Number of successful reads per store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub load_account: usize,
    pub load_account_id_by_username: usize,
    pub load_group: usize,
    pub load_all_groups: usize,
    pub load_subgroups: usize,
    pub load_parent_groups: usize,
    pub load_group_members: usize,
    pub load_groups_with_member: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    accounts: BTreeMap<AccountId, Account>,
    groups: BTreeMap<GroupUuid, InternalGroup>,
    inclusions: DiGraph<GroupUuid, ()>,
    nodes: HashMap<GroupUuid, NodeIndex>,
}

impl StoreState {
    fn node(&mut self, uuid: &GroupUuid) -> NodeIndex {
        if let Some(node) = self.nodes.get(uuid) {
            return *node;
        }
        let node = self.inclusions.add_node(uuid.clone());
        self.nodes.insert(uuid.clone(), node);
        node
    }

    fn include(&mut self, parent: &GroupUuid, subgroup: &GroupUuid) {
        let from = self.node(parent);
        let to = self.node(subgroup);
        if self.inclusions.find_edge(from, to).is_none() {
            self.inclusions.add_edge(from, to, ());
        }
    }

    fn exclude(&mut self, parent: &GroupUuid, subgroup: &GroupUuid) {
        let (Some(from), Some(to)) = (self.nodes.get(parent), self.nodes.get(subgroup)) else {
            return;
        };
        if let Some(edge) = self.inclusions.find_edge(*from, *to) {
            self.inclusions.remove_edge(edge);
        }
    }

    fn neighbors(&self, uuid: &GroupUuid, direction: Direction) -> BTreeSet<GroupUuid> {
        self.nodes
            .get(uuid)
            .map(|node| {
                self.inclusions
                    .neighbors_directed(*node, direction)
                    .map(|n| self.inclusions[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn put_group(&mut self, group: InternalGroup) {
        let previous = self
            .groups
            .get(&group.uuid)
            .map(|g| g.subgroups.clone())
            .unwrap_or_default();
        for subgroup in &previous {
            self.exclude(&group.uuid, subgroup);
        }
        for subgroup in &group.subgroups {
            self.include(&group.uuid, subgroup);
        }
        self.groups.insert(group.uuid.clone(), group);
    }

    fn find_group(&self, key: &GroupKey) -> Option<&InternalGroup> {
        match key {
            GroupKey::Uuid(uuid) => self.groups.get(uuid),
            GroupKey::Id(id) => self.groups.values().find(|g| g.id == *id),
            GroupKey::Name(name) => self.groups.values().find(|g| g.name == *name),
        }
    }

    fn group_mut(&mut self, uuid: &GroupUuid) -> Result<&mut InternalGroup, StoreError> {
        self.groups.get_mut(uuid).ok_or_else(|| {
            StoreError::Rejected {
                reason: format!("no group with uuid {uuid}"),
            }
            .into()
        })
    }

    /// Rejects `name` if it is empty or held by a group other than
    /// `renaming`.
    fn check_name_free(
        &self,
        name: &str,
        renaming: Option<&GroupUuid>,
    ) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Rejected {
                reason: "group name must not be empty".to_string(),
            }
            .into());
        }
        let holder = self.find_group(&GroupKey::Name(name.to_string()));
        if holder.is_some_and(|g| Some(&g.uuid) != renaming) {
            return Err(StoreError::Rejected {
                reason: format!("group name {name:?} is taken"),
            }
            .into());
        }
        Ok(())
    }
}

/// [`IdentityStore`] kept entirely in memory.
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    calls: Mutex<StoreCalls>,
    unavailable: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            calls: Mutex::new(StoreCalls::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Creates a store holding the contents of `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        {
            let mut state = store.write();
            for account in snapshot.accounts {
                state.accounts.insert(account.id(), account);
            }
            for group in snapshot.groups {
                state.put_group(group);
            }
        }
        store
    }

    /// Returns the current contents.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read();
        StoreSnapshot {
            accounts: state.accounts.values().cloned().collect(),
            groups: state.groups.values().cloned().collect(),
        }
    }

    /// Returns how many reads each operation has served.
    #[must_use]
    pub fn calls(&self) -> StoreCalls {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every read fail with [`StoreError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Stores a group record as is, replacing any previous record with
    /// the same uuid. Publishes no event.
    pub fn insert_group(&self, group: InternalGroup) {
        self.write().put_group(group);
    }

    /// Creates or replaces an account.
    pub fn upsert_account(&self, account: Account) -> IdentityEvent {
        let mut state = self.write();
        let mut usernames = BTreeSet::new();
        if let Some(previous) = state.accounts.get(&account.id()) {
            usernames.extend(previous.username().map(str::to_string));
        }
        usernames.extend(account.username().map(str::to_string));
        let account_id = account.id();
        state.accounts.insert(account_id, account);
        debug!(%account_id, "account stored");
        IdentityEvent::AccountUpdated {
            account_id,
            usernames,
        }
    }

    /// Creates an internal group with a fresh id and uuid. The group owns
    /// itself unless `owner` is given.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if the name is empty or taken.
    pub fn create_group(
        &self,
        name: &str,
        owner: Option<GroupUuid>,
    ) -> Result<(InternalGroup, IdentityEvent), StoreError> {
        let mut state = self.write();
        state.check_name_free(name, None)?;

        let next_id = state.groups.values().map(|g| g.id.get()).max().unwrap_or(0) + 1;
        let mut group = InternalGroup::new(GroupId::new(next_id), GroupUuid::generate(), name);
        if let Some(owner) = owner {
            group = group.with_owner(owner);
        }
        state.put_group(group.clone());
        debug!(uuid = %group.uuid, name, "group created");

        let event = IdentityEvent::GroupCreated {
            group_id: group.id,
            uuid: group.uuid.clone(),
            name: group.name.clone(),
        };
        Ok((group, event))
    }

    /// Renames a group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if the group does not exist or the
    /// new name is empty or taken.
    pub fn rename_group(
        &self,
        uuid: &GroupUuid,
        new_name: &str,
    ) -> Result<IdentityEvent, StoreError> {
        let mut state = self.write();
        state.check_name_free(new_name, Some(uuid))?;
        let group = state.group_mut(uuid)?;
        let old_name = std::mem::replace(&mut group.name, new_name.to_string());
        Ok(IdentityEvent::GroupRenamed {
            group_id: group.id,
            uuid: uuid.clone(),
            old_name,
            new_name: new_name.to_string(),
        })
    }

    /// Adds a direct member to a group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if the group does not exist.
    pub fn add_member(
        &self,
        uuid: &GroupUuid,
        account: AccountId,
    ) -> Result<IdentityEvent, StoreError> {
        self.write().group_mut(uuid)?.members.insert(account);
        Ok(Self::members_changed(uuid, [account], []))
    }

    /// Removes a direct member from a group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if the group does not exist.
    pub fn remove_member(
        &self,
        uuid: &GroupUuid,
        account: AccountId,
    ) -> Result<IdentityEvent, StoreError> {
        self.write().group_mut(uuid)?.members.remove(&account);
        Ok(Self::members_changed(uuid, [account], []))
    }

    /// Makes `subgroup` a direct subgroup of a group. `subgroup` may be
    /// any uuid, including groups of other backends.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if the group does not exist.
    pub fn add_subgroup(
        &self,
        uuid: &GroupUuid,
        subgroup: &GroupUuid,
    ) -> Result<IdentityEvent, StoreError> {
        let mut state = self.write();
        state.group_mut(uuid)?.subgroups.insert(subgroup.clone());
        state.include(uuid, subgroup);
        Ok(Self::members_changed(uuid, [], [subgroup.clone()]))
    }

    /// Removes a direct subgroup from a group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if the group does not exist.
    pub fn remove_subgroup(
        &self,
        uuid: &GroupUuid,
        subgroup: &GroupUuid,
    ) -> Result<IdentityEvent, StoreError> {
        let mut state = self.write();
        state.group_mut(uuid)?.subgroups.remove(subgroup);
        state.exclude(uuid, subgroup);
        Ok(Self::members_changed(uuid, [], [subgroup.clone()]))
    }

    /// Deletes a group. Groups that included it keep a stale reference,
    /// as a persistent store without cascading deletes would.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if the group does not exist.
    pub fn delete_group(&self, uuid: &GroupUuid) -> Result<IdentityEvent, StoreError> {
        let mut state = self.write();
        let group = state.groups.remove(uuid).ok_or_else(|| StoreError::Rejected {
            reason: format!("no group with uuid {uuid}"),
        })?;
        for subgroup in &group.subgroups {
            state.exclude(uuid, subgroup);
        }
        debug!(%uuid, name = %group.name, "group deleted");
        Ok(IdentityEvent::GroupDeleted {
            group_id: group.id,
            uuid: group.uuid,
            name: group.name,
            members: group.members,
            subgroups: group.subgroups,
        })
    }

    fn members_changed(
        uuid: &GroupUuid,
        members: impl IntoIterator<Item = AccountId>,
        subgroups: impl IntoIterator<Item = GroupUuid>,
    ) -> IdentityEvent {
        IdentityEvent::GroupMembershipChanged {
            uuid: uuid.clone(),
            members: members.into_iter().collect(),
            subgroups: subgroups.into_iter().collect(),
        }
    }

    /// Fails if the store is switched off, otherwise counts the read.
    fn serve(&self, count: impl FnOnce(&mut StoreCalls)) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "in-memory store switched off".to_string(),
            }
            .into());
        }
        count(&mut self.calls.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn load_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.serve(|c| c.load_account += 1)?;
        Ok(self.read().accounts.get(&id).cloned())
    }

    async fn load_account_id_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountId>, StoreError> {
        self.serve(|c| c.load_account_id_by_username += 1)?;
        Ok(self
            .read()
            .accounts
            .values()
            .find(|a| a.username() == Some(username))
            .map(Account::id))
    }

    async fn load_group(&self, key: &GroupKey) -> Result<Option<InternalGroup>, StoreError> {
        self.serve(|c| c.load_group += 1)?;
        Ok(self.read().find_group(key).cloned())
    }

    async fn load_all_groups(&self) -> Result<Vec<GroupReference>, StoreError> {
        self.serve(|c| c.load_all_groups += 1)?;
        Ok(self.read().groups.values().map(GroupReference::from).collect())
    }

    async fn load_subgroups(&self, group: &GroupUuid) -> Result<BTreeSet<GroupUuid>, StoreError> {
        self.serve(|c| c.load_subgroups += 1)?;
        Ok(self.read().neighbors(group, Direction::Outgoing))
    }

    async fn load_parent_groups(
        &self,
        group: &GroupUuid,
    ) -> Result<BTreeSet<GroupUuid>, StoreError> {
        self.serve(|c| c.load_parent_groups += 1)?;
        Ok(self.read().neighbors(group, Direction::Incoming))
    }

    async fn load_group_members(
        &self,
        group: &GroupUuid,
    ) -> Result<BTreeSet<AccountId>, StoreError> {
        self.serve(|c| c.load_group_members += 1)?;
        Ok(self
            .read()
            .groups
            .get(group)
            .map(|g| g.members.clone())
            .unwrap_or_default())
    }

    async fn load_groups_with_member(
        &self,
        account: AccountId,
    ) -> Result<BTreeSet<GroupUuid>, StoreError> {
        self.serve(|c| c.load_groups_with_member += 1)?;
        Ok(self
            .read()
            .groups
            .values()
            .filter(|g| g.members.contains(&account))
            .map(|g| g.uuid.clone())
            .collect())
    }
}
