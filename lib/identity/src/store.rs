//! Backing store contract.

use crate::account::Account;
use crate::group::{GroupKey, GroupReference, InternalGroup};
use async_trait::async_trait;
use revu_core::{AccountId, GroupUuid, Result, StoreError};
use std::collections::BTreeSet;

/// Durable source of accounts, groups and inclusion edges.
///
/// Lookups of absent entities answer `None` or an empty set; errors are
/// reserved for store failures.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Loads an account.
    async fn load_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Resolves a username to its account.
    async fn load_account_id_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountId>, StoreError>;

    /// Loads an internal group by any of its keys.
    async fn load_group(&self, key: &GroupKey) -> Result<Option<InternalGroup>, StoreError>;

    /// Lists every internal group.
    async fn load_all_groups(&self) -> Result<Vec<GroupReference>, StoreError>;

    /// Loads the groups directly included by `group`.
    async fn load_subgroups(&self, group: &GroupUuid) -> Result<BTreeSet<GroupUuid>, StoreError>;

    /// Loads the internal groups that directly include `group`.
    async fn load_parent_groups(
        &self,
        group: &GroupUuid,
    ) -> Result<BTreeSet<GroupUuid>, StoreError>;

    /// Loads the direct members of `group`.
    async fn load_group_members(
        &self,
        group: &GroupUuid,
    ) -> Result<BTreeSet<AccountId>, StoreError>;

    /// Loads the internal groups `account` is a direct member of.
    async fn load_groups_with_member(
        &self,
        account: AccountId,
    ) -> Result<BTreeSet<GroupUuid>, StoreError>;
}
