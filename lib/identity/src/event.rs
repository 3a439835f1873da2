//! Identity change events and the evictions they require.

use crate::account_cache::AccountCache;
use crate::group_cache::GroupCache;
use crate::include_cache::GroupIncludeCache;
use revu_core::{AccountId, GroupId, GroupUuid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A change to accounts or groups published by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityEvent {
    /// An account was created or modified.
    AccountUpdated {
        /// The account.
        account_id: AccountId,
        /// Usernames whose index entry changed: the previous and the new one.
        usernames: BTreeSet<String>,
    },
    /// A group was created.
    GroupCreated {
        /// Integer id of the new group.
        group_id: GroupId,
        /// Uuid of the new group.
        uuid: GroupUuid,
        /// Name of the new group.
        name: String,
    },
    /// A group was renamed.
    GroupRenamed {
        /// Integer id of the group.
        group_id: GroupId,
        /// Uuid of the group.
        uuid: GroupUuid,
        /// Name before the rename.
        old_name: String,
        /// Name after the rename.
        new_name: String,
    },
    /// Direct members or subgroups of a group changed.
    GroupMembershipChanged {
        /// The group whose membership changed.
        uuid: GroupUuid,
        /// Accounts added or removed.
        members: BTreeSet<AccountId>,
        /// Subgroups added or removed.
        subgroups: BTreeSet<GroupUuid>,
    },
    /// A group was deleted.
    GroupDeleted {
        /// Integer id of the deleted group.
        group_id: GroupId,
        /// Uuid of the deleted group.
        uuid: GroupUuid,
        /// Name of the deleted group.
        name: String,
        /// Direct members at deletion time.
        members: BTreeSet<AccountId>,
        /// Direct subgroups at deletion time.
        subgroups: BTreeSet<GroupUuid>,
    },
}

/// Applies [`IdentityEvent`]s to the identity caches.
#[derive(Debug, Clone)]
pub struct CacheEvictor {
    accounts: Arc<AccountCache>,
    groups: Arc<GroupCache>,
    includes: Arc<GroupIncludeCache>,
}

impl CacheEvictor {
    /// Creates an evictor over the given caches.
    #[must_use]
    pub fn new(
        accounts: Arc<AccountCache>,
        groups: Arc<GroupCache>,
        includes: Arc<GroupIncludeCache>,
    ) -> Self {
        Self {
            accounts,
            groups,
            includes,
        }
    }

    /// Evicts every cache entry `event` may have made stale.
    ///
    /// Returns once the evictions are visible to every later lookup.
    #[instrument(skip(self))]
    pub async fn handle(&self, event: &IdentityEvent) {
        match event {
            IdentityEvent::AccountUpdated {
                account_id,
                usernames,
            } => {
                self.accounts.evict(*account_id).await;
                for username in usernames {
                    self.accounts.evict_username(username).await;
                }
            }
            IdentityEvent::GroupCreated {
                group_id,
                uuid,
                name,
            } => {
                self.groups.on_create(*group_id, uuid, name).await;
                self.evict_edges_of(uuid).await;
            }
            IdentityEvent::GroupRenamed {
                group_id,
                uuid,
                old_name,
                new_name,
            } => {
                self.groups
                    .on_rename(*group_id, uuid, old_name, new_name)
                    .await;
            }
            IdentityEvent::GroupMembershipChanged {
                uuid,
                members,
                subgroups,
            } => {
                self.groups.evict_by_uuid(uuid).await;
                self.evict_edges_of(uuid).await;
                self.evict_related(members, subgroups).await;
            }
            IdentityEvent::GroupDeleted {
                group_id,
                uuid,
                name,
                members,
                subgroups,
            } => {
                self.groups.evict_by_id(*group_id).await;
                self.groups.evict_by_uuid(uuid).await;
                self.groups.evict_by_name(name).await;
                self.evict_edges_of(uuid).await;
                self.evict_related(members, subgroups).await;
            }
        }
        debug!("applied identity event");
    }

    async fn evict_edges_of(&self, uuid: &GroupUuid) {
        self.includes.evict_subgroups_of(uuid).await;
        self.includes.evict_parent_groups_of(uuid).await;
        self.includes.evict_members_of(uuid).await;
    }

    /// Account states are built from direct memberships, which
    /// [`AccountCache::evict`] drops before the state itself.
    async fn evict_related(
        &self,
        members: &BTreeSet<AccountId>,
        subgroups: &BTreeSet<GroupUuid>,
    ) {
        for subgroup in subgroups {
            self.includes.evict_parent_groups_of(subgroup).await;
        }
        for account in members {
            self.accounts.evict(*account).await;
        }
    }
}
