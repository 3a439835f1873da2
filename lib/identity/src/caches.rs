//! The identity caches, wired together.

use crate::account_cache::AccountCache;
use crate::cache::CacheStats;
use crate::config::IdentityCacheConfig;
use crate::event::CacheEvictor;
use crate::group_cache::GroupCache;
use crate::include_cache::GroupIncludeCache;
use crate::store::IdentityStore;
use std::sync::Arc;

/// Account, group and inclusion caches sharing one backing store.
#[derive(Debug, Clone)]
pub struct IdentityCaches {
    /// Account states.
    pub accounts: Arc<AccountCache>,
    /// Internal group records.
    pub groups: Arc<GroupCache>,
    /// Inclusion edges and direct memberships.
    pub includes: Arc<GroupIncludeCache>,
}

impl IdentityCaches {
    /// Creates empty caches in front of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, config: &IdentityCacheConfig) -> Self {
        let includes = Arc::new(GroupIncludeCache::new(Arc::clone(&store), &config.includes));
        let accounts = Arc::new(AccountCache::new(
            Arc::clone(&store),
            Arc::clone(&includes),
            &config.accounts,
        ));
        let groups = Arc::new(GroupCache::new(store, &config.groups));
        Self {
            accounts,
            groups,
            includes,
        }
    }

    /// Returns an evictor that keeps these caches coherent with the store.
    #[must_use]
    pub fn evictor(&self) -> CacheEvictor {
        CacheEvictor::new(
            Arc::clone(&self.accounts),
            Arc::clone(&self.groups),
            Arc::clone(&self.includes),
        )
    }

    /// Drops every entry of every cache.
    pub fn evict_all(&self) {
        self.accounts.evict_all();
        self.groups.evict_all();
        self.includes.evict_all();
    }

    /// Returns the counters of every cache.
    #[must_use]
    pub fn stats(&self) -> Vec<CacheStats> {
        let mut stats = self.accounts.stats();
        stats.extend(self.groups.stats());
        stats.extend(self.includes.stats());
        stats
    }
}
