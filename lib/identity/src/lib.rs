//! Account and group identity for the revu code-review server.
//!
//! This crate maps identity keys to cached state:
//!
//! - **Records**: [`Account`], [`AccountState`], [`InternalGroup`] and
//!   [`GroupDescription`]
//! - **Backing store**: the [`IdentityStore`] contract and the
//!   [`InMemoryStore`] implementation
//! - **Caches**: [`AccountCache`], [`GroupCache`] and [`GroupIncludeCache`],
//!   built on a [`LoadingCache`] that coalesces concurrent loads per key
//! - **Coherence**: [`IdentityEvent`]s applied by a [`CacheEvictor`]
//! - **System groups**: [`SystemGroups`]

pub mod account;
pub mod account_cache;
pub mod cache;
pub mod caches;
pub mod config;
pub mod event;
pub mod group;
pub mod group_cache;
pub mod include_cache;
pub mod memory;
pub mod store;
pub mod system;

#[cfg(test)]
pub(crate) mod testing;

pub use account::{Account, AccountState};
pub use account_cache::AccountCache;
pub use cache::{CacheStats, LoadingCache};
pub use caches::IdentityCaches;
pub use config::{CacheConfig, IdentityCacheConfig};
pub use event::{CacheEvictor, IdentityEvent};
pub use group::{GroupDescription, GroupKey, GroupReference, InternalGroup};
pub use group_cache::GroupCache;
pub use include_cache::GroupIncludeCache;
pub use memory::{InMemoryStore, StoreCalls, StoreSnapshot};
pub use store::IdentityStore;
pub use system::SystemGroups;
