//! Test fixtures.

use crate::account::Account;
use crate::group::{GroupKey, GroupReference, InternalGroup};
use crate::memory::InMemoryStore;
use crate::store::IdentityStore;
use async_trait::async_trait;
use revu_core::{AccountId, GroupId, GroupUuid, Result, StoreError};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, Semaphore};

pub(crate) fn uuid(s: &str) -> GroupUuid {
    GroupUuid::parse(s).expect("valid uuid")
}

/// A self-owned group with no members.
pub(crate) fn group(id: i32, uuid_str: &str, name: &str) -> InternalGroup {
    InternalGroup::new(GroupId::new(id), uuid(uuid_str), name)
}

/// Holds tasks until opened, reporting each arrival.
#[derive(Debug)]
pub(crate) struct Gate {
    arrived: Notify,
    opened: Semaphore,
}

impl Gate {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            arrived: Notify::new(),
            opened: Semaphore::new(0),
        })
    }

    /// Waits until the gate is open.
    pub(crate) async fn pass(&self) {
        self.arrived.notify_one();
        let _permit = self.opened.acquire().await.expect("gate semaphore");
    }

    /// Waits until some task has reached the gate.
    pub(crate) async fn arrival(&self) {
        self.arrived.notified().await;
    }

    /// Lets every task through, now and later.
    pub(crate) fn open(&self) {
        self.opened.add_permits(1);
    }
}

/// Store whose next group or account membership load is held at a gate
/// after it has read the inner store.
pub(crate) struct GatedStore {
    inner: Arc<InMemoryStore>,
    gate: Arc<Gate>,
    armed: AtomicBool,
}

impl GatedStore {
    pub(crate) fn new(inner: Arc<InMemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate: Gate::new(),
            armed: AtomicBool::new(false),
        })
    }

    pub(crate) fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub(crate) fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Holds the next gated load.
    pub(crate) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    async fn hold<T>(&self, loaded: T) -> T {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.gate.pass().await;
        }
        loaded
    }
}

#[async_trait]
impl IdentityStore for GatedStore {
    async fn load_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.inner.load_account(id).await
    }

    async fn load_account_id_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountId>, StoreError> {
        self.inner.load_account_id_by_username(username).await
    }

    async fn load_group(&self, key: &GroupKey) -> Result<Option<InternalGroup>, StoreError> {
        let loaded = self.inner.load_group(key).await;
        self.hold(loaded).await
    }

    async fn load_all_groups(&self) -> Result<Vec<GroupReference>, StoreError> {
        self.inner.load_all_groups().await
    }

    async fn load_subgroups(&self, group: &GroupUuid) -> Result<BTreeSet<GroupUuid>, StoreError> {
        self.inner.load_subgroups(group).await
    }

    async fn load_parent_groups(
        &self,
        group: &GroupUuid,
    ) -> Result<BTreeSet<GroupUuid>, StoreError> {
        self.inner.load_parent_groups(group).await
    }

    async fn load_group_members(
        &self,
        group: &GroupUuid,
    ) -> Result<BTreeSet<AccountId>, StoreError> {
        self.inner.load_group_members(group).await
    }

    async fn load_groups_with_member(
        &self,
        account: AccountId,
    ) -> Result<BTreeSet<GroupUuid>, StoreError> {
        let loaded = self.inner.load_groups_with_member(account).await;
        self.hold(loaded).await
    }
}
