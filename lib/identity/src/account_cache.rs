//! Cache of account states.

use crate::account::AccountState;
use crate::cache::{CacheStats, LoadingCache};
use crate::config::CacheConfig;
use crate::include_cache::GroupIncludeCache;
use crate::store::IdentityStore;
use revu_core::{AccountId, Result, StoreError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Caches [`AccountState`] by account id, plus a username index.
///
/// Unknown accounts are never an error: they resolve to
/// [`AccountState::missing`], which is cached like any other state.
pub struct AccountCache {
    store: Arc<dyn IdentityStore>,
    includes: Arc<GroupIncludeCache>,
    by_id: LoadingCache<AccountId, Arc<AccountState>>,
    by_username: LoadingCache<String, Option<AccountId>>,
}

impl AccountCache {
    /// Creates an empty cache in front of `store`. Direct group
    /// memberships are resolved through `includes`.
    #[must_use]
    pub fn new(
        store: Arc<dyn IdentityStore>,
        includes: Arc<GroupIncludeCache>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            store,
            includes,
            by_id: LoadingCache::new("accounts", config),
            by_username: LoadingCache::new("usernames", config),
        }
    }

    /// Returns the state of account `id`, loading it on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails. An unknown account is not an
    /// error.
    #[instrument(skip(self))]
    pub async fn get(&self, id: AccountId) -> Result<Arc<AccountState>, StoreError> {
        self.by_id.get_or_load(&id, || self.load(id)).await
    }

    /// Returns the state of account `id` if it is resident.
    pub async fn get_if_present(&self, id: AccountId) -> Option<Arc<AccountState>> {
        self.by_id.get_if_present(&id).await
    }

    /// Returns the state of the account with `username`, or `None` if no
    /// existing account has it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Arc<AccountState>>, StoreError> {
        let key = username.to_string();
        let id = self
            .by_username
            .get_or_load(&key, || self.store.load_account_id_by_username(username))
            .await?;
        let Some(id) = id else {
            return Ok(None);
        };
        let state = self.get(id).await?;
        Ok((!state.is_missing()).then_some(state))
    }

    /// Drops account `id` and its direct group memberships.
    ///
    /// Memberships go first: a state built from them between the two
    /// evictions is still dropped with `id`.
    pub async fn evict(&self, id: AccountId) {
        self.includes.evict_groups_with_member(id).await;
        self.by_id.evict(&id).await;
    }

    /// Drops the username index entry for `username`.
    pub async fn evict_username(&self, username: &str) {
        self.by_username.evict(&username.to_string()).await;
    }

    /// Drops every account and username entry.
    pub fn evict_all(&self) {
        self.by_id.evict_all();
        self.by_username.evict_all();
    }

    /// Returns the counters of the account and username caches.
    #[must_use]
    pub fn stats(&self) -> Vec<CacheStats> {
        vec![self.by_id.stats(), self.by_username.stats()]
    }

    async fn load(&self, id: AccountId) -> Result<Arc<AccountState>, StoreError> {
        let Some(account) = self.store.load_account(id).await? else {
            debug!(%id, "no such account");
            return Ok(Arc::new(AccountState::missing(id)));
        };
        let groups = self.includes.groups_with_member(id).await?;
        Ok(Arc::new(AccountState::new(account, (*groups).clone())))
    }
}

impl fmt::Debug for AccountCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCache")
            .field("by_id", &self.by_id)
            .field("by_username", &self.by_username)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::memory::InMemoryStore;
    use crate::testing::{GatedStore, group, uuid};
    use std::collections::BTreeSet;

    fn fixture() -> (Arc<InMemoryStore>, Arc<AccountCache>) {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_account(Account::new(AccountId::new(1)).with_username("alice"));
        store.insert_group(group(1, "devs", "Developers").with_members([AccountId::new(1)]));
        let config = CacheConfig::default();
        let includes = Arc::new(GroupIncludeCache::new(store.clone(), &config));
        let cache = Arc::new(AccountCache::new(store.clone(), includes, &config));
        (store, cache)
    }

    #[tokio::test]
    async fn unknown_account_yields_missing_sentinel() {
        let (store, cache) = fixture();

        let state = cache.get(AccountId::new(42)).await.unwrap();
        assert!(state.is_missing());
        assert!(state.account().is_none());
        assert_eq!(state.account_id(), AccountId::new(42));

        // The sentinel is cached like any other state.
        cache.get(AccountId::new(42)).await.unwrap();
        assert_eq!(store.calls().load_account, 1);
    }

    #[tokio::test]
    async fn state_carries_direct_groups() {
        let (_store, cache) = fixture();
        assert!(cache.get_if_present(AccountId::new(1)).await.is_none());

        let state = cache.get(AccountId::new(1)).await.unwrap();
        assert_eq!(state.internal_groups(), &BTreeSet::from([uuid("devs")]));
        assert!(cache.get_if_present(AccountId::new(1)).await.is_some());
    }

    #[tokio::test]
    async fn evict_is_visible_to_next_get() {
        let (store, cache) = fixture();
        let id = AccountId::new(1);
        let before = cache.get(id).await.unwrap();

        store.upsert_account(Account::new(id).with_full_name("Alice Liddell"));
        store.remove_member(&uuid("devs"), id).expect("remove member");
        assert_eq!(cache.get(id).await.unwrap(), before);

        cache.evict(id).await;
        let after = cache.get(id).await.unwrap();
        assert_eq!(after.account().and_then(Account::full_name), Some("Alice Liddell"));
        assert!(after.internal_groups().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_load_once() {
        let (store, cache) = fixture();

        let loads = (0..8).map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(AccountId::new(1)).await })
        });
        for state in futures::future::join_all(loads).await {
            let state = state.expect("join").unwrap();
            assert!(!state.is_missing());
        }
        assert_eq!(store.calls().load_account, 1);
    }

    #[tokio::test]
    async fn username_index() {
        let (store, cache) = fixture();

        let alice = cache.get_by_username("alice").await.unwrap().expect("alice");
        assert_eq!(alice.account_id(), AccountId::new(1));
        assert!(cache.get_by_username("bob").await.unwrap().is_none());

        store.upsert_account(Account::new(AccountId::new(2)).with_username("bob"));
        assert!(cache.get_by_username("bob").await.unwrap().is_none(), "negative entry");
        cache.evict_username("bob").await;
        let bob = cache.get_by_username("bob").await.unwrap().expect("bob");
        assert_eq!(bob.account_id(), AccountId::new(2));
    }

    #[tokio::test]
    async fn store_failure_is_not_a_sentinel() {
        let (store, cache) = fixture();
        store.set_unavailable(true);
        let err = cache.get(AccountId::new(42)).await.unwrap_err();
        assert!(matches!(err.current_context(), StoreError::Unavailable { .. }));
        assert!(cache.get_if_present(AccountId::new(42)).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn evict_reaches_a_load_in_flight() {
        let store = GatedStore::new(Arc::new(InMemoryStore::new()));
        let id = AccountId::new(1);
        store.inner().upsert_account(Account::new(id).with_username("alice"));
        store.inner().insert_group(group(1, "devs", "Developers").with_members([id]));
        let config = CacheConfig::default();
        let includes = Arc::new(GroupIncludeCache::new(store.clone(), &config));
        let cache = Arc::new(AccountCache::new(store.clone(), includes, &config));

        // Hold the state load after it has read the old memberships.
        store.arm();
        let parked = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(id).await })
        };
        store.gate().arrival().await;

        store.inner().remove_member(&uuid("devs"), id).expect("remove member");
        cache.evict(id).await;
        store.gate().open();

        assert!(parked.await.expect("join").unwrap().internal_groups().is_empty());
        assert!(cache.get(id).await.unwrap().internal_groups().is_empty());
    }
}
