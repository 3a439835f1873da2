//! Cache of group inclusion edges and direct memberships.

use crate::cache::{CacheStats, LoadingCache};
use crate::config::CacheConfig;
use crate::store::IdentityStore;
use async_trait::async_trait;
use revu_core::{AccountId, GroupUuid, Result, StoreError};
use revu_membership::GroupIncludeIndex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Caches the four directions of the membership graph:
/// subgroups and parents of a group, members of a group, and groups of
/// an account.
///
/// Only internal groups have members or subgroups in the store; lookups
/// for other uuids answer empty sets without a store round trip.
pub struct GroupIncludeCache {
    store: Arc<dyn IdentityStore>,
    subgroups: LoadingCache<GroupUuid, Arc<BTreeSet<GroupUuid>>>,
    parents: LoadingCache<GroupUuid, Arc<BTreeSet<GroupUuid>>>,
    members: LoadingCache<GroupUuid, Arc<BTreeSet<AccountId>>>,
    groups_with_member: LoadingCache<AccountId, Arc<BTreeSet<GroupUuid>>>,
}

impl GroupIncludeCache {
    /// Creates an empty cache in front of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            subgroups: LoadingCache::new("subgroups", config),
            parents: LoadingCache::new("parent_groups", config),
            members: LoadingCache::new("group_members", config),
            groups_with_member: LoadingCache::new("groups_with_member", config),
        }
    }

    /// Returns the direct members of `group`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn members_of(
        &self,
        group: &GroupUuid,
    ) -> Result<Arc<BTreeSet<AccountId>>, StoreError> {
        if !group.is_internal() {
            return Ok(Arc::default());
        }
        self.members
            .get_or_load(group, || async {
                self.store.load_group_members(group).await.map(Arc::new)
            })
            .await
    }

    /// Returns the internal groups `account` directly belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn groups_with_member(
        &self,
        account: AccountId,
    ) -> Result<Arc<BTreeSet<GroupUuid>>, StoreError> {
        self.groups_with_member
            .get_or_load(&account, || async {
                self.store.load_groups_with_member(account).await.map(Arc::new)
            })
            .await
    }

    /// Drops the cached subgroups of `group`.
    pub async fn evict_subgroups_of(&self, group: &GroupUuid) {
        self.subgroups.evict(group).await;
    }

    /// Drops the cached parents of `group`.
    pub async fn evict_parent_groups_of(&self, group: &GroupUuid) {
        self.parents.evict(group).await;
    }

    /// Drops the cached members of `group`.
    pub async fn evict_members_of(&self, group: &GroupUuid) {
        self.members.evict(group).await;
    }

    /// Drops the cached groups of `account`.
    pub async fn evict_groups_with_member(&self, account: AccountId) {
        self.groups_with_member.evict(&account).await;
    }

    /// Drops every cached edge and membership.
    pub fn evict_all(&self) {
        self.subgroups.evict_all();
        self.parents.evict_all();
        self.members.evict_all();
        self.groups_with_member.evict_all();
    }

    /// Returns the counters of every underlying cache.
    #[must_use]
    pub fn stats(&self) -> Vec<CacheStats> {
        vec![
            self.subgroups.stats(),
            self.parents.stats(),
            self.members.stats(),
            self.groups_with_member.stats(),
        ]
    }
}

#[async_trait]
impl GroupIncludeIndex for GroupIncludeCache {
    #[instrument(skip(self))]
    async fn parent_groups_of(
        &self,
        group: &GroupUuid,
    ) -> Result<Arc<BTreeSet<GroupUuid>>, StoreError> {
        self.parents
            .get_or_load(group, || async {
                self.store.load_parent_groups(group).await.map(Arc::new)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn subgroups_of(
        &self,
        group: &GroupUuid,
    ) -> Result<Arc<BTreeSet<GroupUuid>>, StoreError> {
        if !group.is_internal() {
            return Ok(Arc::default());
        }
        self.subgroups
            .get_or_load(group, || async {
                self.store.load_subgroups(group).await.map(Arc::new)
            })
            .await
    }
}

impl fmt::Debug for GroupIncludeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupIncludeCache")
            .field("subgroups", &self.subgroups)
            .field("parents", &self.parents)
            .field("members", &self.members)
            .field("groups_with_member", &self.groups_with_member)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::testing::{group, uuid};

    fn fixture() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert_group(
            group(1, "parent", "Parent").with_subgroups([uuid("child"), uuid("ldap:cn=ext")]),
        );
        store.insert_group(group(2, "child", "Child").with_members([AccountId::new(7)]));
        store
    }

    fn cache(store: &Arc<InMemoryStore>) -> GroupIncludeCache {
        GroupIncludeCache::new(store.clone(), &CacheConfig::default())
    }

    #[tokio::test]
    async fn edges_are_cached_in_both_directions() {
        let store = fixture();
        let cache = cache(&store);

        let subgroups = cache.subgroups_of(&uuid("parent")).await.unwrap();
        assert!(subgroups.contains(&uuid("child")));
        let parents = cache.parent_groups_of(&uuid("child")).await.unwrap();
        assert_eq!(*parents, BTreeSet::from([uuid("parent")]));
        let parents = cache.parent_groups_of(&uuid("ldap:cn=ext")).await.unwrap();
        assert_eq!(*parents, BTreeSet::from([uuid("parent")]));

        cache.parent_groups_of(&uuid("child")).await.unwrap();
        assert_eq!(store.calls().load_parent_groups, 2);
        assert_eq!(store.calls().load_subgroups, 1);
    }

    #[tokio::test]
    async fn non_internal_groups_skip_the_store() {
        let store = fixture();
        let cache = cache(&store);

        assert!(cache.members_of(&uuid("ldap:cn=ext")).await.unwrap().is_empty());
        let system = uuid("global:Registered-Users");
        assert!(cache.subgroups_of(&system).await.unwrap().is_empty());
        let calls = store.calls();
        assert_eq!(calls.load_group_members + calls.load_subgroups, 0);
    }

    #[tokio::test]
    async fn eviction_exposes_store_changes() {
        let store = fixture();
        let cache = cache(&store);
        let account = AccountId::new(7);

        assert_eq!(
            *cache.groups_with_member(account).await.unwrap(),
            BTreeSet::from([uuid("child")])
        );
        store.add_member(&uuid("parent"), account).expect("add member");
        assert_eq!(cache.groups_with_member(account).await.unwrap().len(), 1);

        cache.evict_groups_with_member(account).await;
        cache.evict_members_of(&uuid("parent")).await;
        assert_eq!(cache.groups_with_member(account).await.unwrap().len(), 2);
        assert!(cache.members_of(&uuid("parent")).await.unwrap().contains(&account));
    }

    #[tokio::test]
    async fn store_outage_propagates() {
        let store = fixture();
        let cache = cache(&store);
        store.set_unavailable(true);

        let err = cache.parent_groups_of(&uuid("child")).await.unwrap_err();
        assert!(matches!(err.current_context(), StoreError::Unavailable { .. }));

        store.set_unavailable(false);
        assert!(cache.parent_groups_of(&uuid("child")).await.is_ok());
    }
}
