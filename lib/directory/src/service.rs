//! The query surface request handlers use.

use crate::account_info::AccountInfoCacheFactory;
use crate::error::DirectoryError;
use crate::group_detail::{GroupDetail, GroupDetailFactory};
use crate::group_info::GroupInfoCacheFactory;
use crate::group_members::GroupMembersFactory;
use revu_access::{CapabilityPolicy, CurrentUser, CurrentUserFactory, GroupControlFactory};
use revu_core::{AccountId, GroupUuid, Result};
use revu_identity::{
    Account, AccountState, CacheEvictor, CacheStats, IdentityCacheConfig, IdentityCaches,
    IdentityEvent, IdentityStore, InternalGroup,
};
use revu_membership::GroupMembership;
use rootcause::prelude::ResultExt;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Accounts, groups and memberships, cached in front of an
/// [`IdentityStore`].
///
/// Cloning is cheap; clones share caches.
#[derive(Debug, Clone)]
pub struct IdentityService {
    caches: IdentityCaches,
    users: CurrentUserFactory,
    controls: GroupControlFactory,
    evictor: CacheEvictor,
}

impl IdentityService {
    /// Creates a service with empty caches in front of `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn IdentityStore>,
        config: &IdentityCacheConfig,
        policy: CapabilityPolicy,
    ) -> Self {
        let caches = IdentityCaches::new(store, config);
        Self {
            users: CurrentUserFactory::new(caches.clone(), Arc::new(policy)),
            controls: GroupControlFactory::new(Arc::clone(&caches.groups)),
            evictor: caches.evictor(),
            caches,
        }
    }

    /// Returns the state of account `id`, a missing sentinel if there is no
    /// such account.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the account fails.
    pub async fn account(&self, id: AccountId) -> Result<Arc<AccountState>, DirectoryError> {
        self.caches
            .accounts
            .get(id)
            .await
            .context(DirectoryError::LookupFailed {
                what: format!("account {id}"),
            })
            .inspect_err(|err| warn!(%id, ?err, "account lookup failed"))
    }

    /// Returns the state of the account with `username`.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the account fails.
    pub async fn account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Arc<AccountState>>, DirectoryError> {
        self.caches
            .accounts
            .get_by_username(username)
            .await
            .context(DirectoryError::LookupFailed {
                what: format!("username {username}"),
            })
    }

    /// Returns the internal group with uuid `uuid`.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the group fails.
    pub async fn group(
        &self,
        uuid: &GroupUuid,
    ) -> Result<Option<Arc<InternalGroup>>, DirectoryError> {
        self.caches
            .groups
            .get_by_uuid(uuid)
            .await
            .context(DirectoryError::LookupFailed {
                what: format!("group {uuid}"),
            })
            .inspect_err(|err| warn!(%uuid, ?err, "group lookup failed"))
    }

    /// Returns the groups `seed` grants membership of, expanded lazily
    /// through group inclusion.
    #[must_use]
    pub fn memberships_of(&self, seed: impl IntoIterator<Item = GroupUuid>) -> GroupMembership {
        GroupMembership::materialized(self.caches.includes.clone(), seed)
    }

    /// Returns the detail of group `uuid` as `user` may see it.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NoSuchGroup`] if the group does not exist
    /// or `user` may not see it, and [`DirectoryError::LookupFailed`] if a
    /// lookup fails.
    #[instrument(skip(self, user))]
    pub async fn group_detail(
        &self,
        uuid: &GroupUuid,
        user: &CurrentUser,
    ) -> Result<GroupDetail, DirectoryError> {
        GroupDetailFactory::new(&self.caches, &self.controls)
            .create(uuid, user)
            .await
    }

    /// Returns every account that is a member of `root`, directly or
    /// through included groups.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NoSuchGroup`] if the group does not exist
    /// or `user` may not see it, and [`DirectoryError::LookupFailed`] if a
    /// lookup fails.
    pub async fn group_members(
        &self,
        root: &GroupUuid,
        user: &CurrentUser,
    ) -> Result<Vec<Account>, DirectoryError> {
        GroupMembersFactory::new(&self.caches, &self.controls)
            .list_accounts(root, user)
            .await
    }

    /// Returns the user signed in as `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the account fails.
    pub async fn user_for(&self, id: AccountId) -> Result<CurrentUser, DirectoryError> {
        self.users
            .identified(id)
            .await
            .context(DirectoryError::LookupFailed {
                what: format!("account {id}"),
            })
    }

    /// Returns a user who is not signed in.
    #[must_use]
    pub fn anonymous_user(&self) -> CurrentUser {
        self.users.anonymous()
    }

    /// Returns the server's own user, which sees every group.
    #[must_use]
    pub fn internal_user(&self) -> CurrentUser {
        self.users.internal()
    }

    /// Applies the cache evictions `event` calls for.
    ///
    /// Lookups started after this returns observe the change.
    pub async fn handle_event(&self, event: &IdentityEvent) {
        self.evictor.handle(event).await;
    }

    /// Returns a request-scoped account summary factory.
    #[must_use]
    pub fn account_infos(&self) -> AccountInfoCacheFactory<'_> {
        AccountInfoCacheFactory::new(&self.caches.accounts)
    }

    /// Returns a request-scoped group summary factory.
    #[must_use]
    pub fn group_infos(&self) -> GroupInfoCacheFactory<'_> {
        GroupInfoCacheFactory::new(&self.caches.groups)
    }

    /// Returns the underlying caches.
    #[must_use]
    pub fn caches(&self) -> &IdentityCaches {
        &self.caches
    }

    /// Returns the counters of every cache.
    #[must_use]
    pub fn stats(&self) -> Vec<CacheStats> {
        self.caches.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{policy, populated_store, uuid};
    use revu_identity::InMemoryStore;

    fn service() -> (Arc<InMemoryStore>, IdentityService) {
        let store = Arc::new(populated_store());
        let service = IdentityService::new(store.clone(), &IdentityCacheConfig::default(), policy());
        (store, service)
    }

    #[tokio::test]
    async fn account_lookups() {
        let (_store, service) = service();

        let alice = service.account(AccountId::new(1)).await.unwrap();
        assert_eq!(alice.account().and_then(Account::username), Some("alice"));

        let missing = service.account(AccountId::new(42)).await.unwrap();
        assert!(missing.is_missing());

        let bob = service.account_by_username("bob").await.unwrap().expect("bob");
        assert_eq!(bob.account_id(), AccountId::new(2));
        assert!(service.account_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memberships_follow_inclusion() {
        let (_store, service) = service();

        // r2 includes r, so a member of r is a member of r2 as well.
        let mut membership = service.memberships_of([uuid("r")]);
        assert!(membership.contains(&uuid("r2")).await.unwrap());
        assert!(!membership.contains(&uuid("leads")).await.unwrap());
    }

    #[tokio::test]
    async fn events_keep_answers_fresh() {
        let (store, service) = service();
        let admin = service.user_for(AccountId::new(1)).await.unwrap();
        let before = service.group_members(&uuid("r"), &admin).await.unwrap();
        assert_eq!(before.len(), 2);

        let event = store.add_member(&uuid("r2"), AccountId::new(1)).expect("add member");
        service.handle_event(&event).await;

        let after = service.group_members(&uuid("r"), &admin).await.unwrap();
        let ids: Vec<_> = after.iter().map(Account::id).collect();
        assert_eq!(ids, vec![AccountId::new(1), AccountId::new(2), AccountId::new(3)]);
    }

    #[tokio::test]
    async fn group_detail_requires_visibility() {
        let (_store, service) = service();

        let anonymous = service.anonymous_user();
        let err = service.group_detail(&uuid("r"), &anonymous).await.unwrap_err();
        assert!(matches!(err.current_context(), DirectoryError::NoSuchGroup { .. }));

        let lead = service.user_for(AccountId::new(2)).await.unwrap();
        let detail = service.group_detail(&uuid("r"), &lead).await.unwrap();
        assert_eq!(detail.owner.uuid, uuid("leads"));
    }

    #[tokio::test]
    async fn store_outage_is_reported() {
        let (store, service) = service();
        store.set_unavailable(true);

        let err = service.group(&uuid("r")).await.unwrap_err();
        assert!(matches!(err.current_context(), DirectoryError::LookupFailed { .. }));
        assert!(service.stats().iter().any(|s| s.misses > 0));
    }
}
