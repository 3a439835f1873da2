//! Shared test data.
//!
//! Accounts: 1 `alice` (administrator), 2 `bob` (lead), 3 `carol`.
//! Account 42 is a member of R2 but has no account record.
//!
//! Groups, all owned by `leads` except `admins` and `leads` themselves:
//!
//! ```text
//! admins (1)  members {1}
//! r      (2)  members {2}      includes r2, gone, ldap:cn=ext, Registered Users
//! r2     (3)  members {3, 42}  includes r
//! leads  (4)  members {2}
//! ```

use revu_access::{CapabilityPolicy, CurrentUserFactory, GlobalCapability, GroupControlFactory};
use revu_core::{AccountId, GroupId, GroupUuid};
use revu_identity::{
    Account, IdentityCacheConfig, IdentityCaches, InMemoryStore, InternalGroup, SystemGroups,
};
use std::sync::Arc;

pub(crate) fn uuid(s: &str) -> GroupUuid {
    GroupUuid::parse(s).expect("valid uuid")
}

pub(crate) fn policy() -> CapabilityPolicy {
    CapabilityPolicy::none().with_grant(GlobalCapability::AdministrateServer, uuid("admins"))
}

pub(crate) fn populated_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.upsert_account(
        Account::new(AccountId::new(1))
            .with_full_name("Alice Admin")
            .with_preferred_email("alice@example.com")
            .with_username("alice"),
    );
    store.upsert_account(Account::new(AccountId::new(2)).with_username("bob"));
    store.upsert_account(Account::new(AccountId::new(3)).with_full_name("Carol"));

    store.insert_group(
        InternalGroup::new(GroupId::new(1), uuid("admins"), "Administrators")
            .with_members([AccountId::new(1)]),
    );
    store.insert_group(
        InternalGroup::new(GroupId::new(2), uuid("r"), "R")
            .with_owner(uuid("leads"))
            .with_description("Release managers")
            .with_members([AccountId::new(2)])
            .with_subgroups([
                uuid("r2"),
                uuid("gone"),
                uuid("ldap:cn=ext"),
                SystemGroups::registered_users(),
            ]),
    );
    store.insert_group(
        InternalGroup::new(GroupId::new(3), uuid("r2"), "R2")
            .with_owner(uuid("leads"))
            .with_members([AccountId::new(3), AccountId::new(42)])
            .with_subgroups([uuid("r")]),
    );
    store.insert_group(
        InternalGroup::new(GroupId::new(4), uuid("leads"), "Leads").with_members([AccountId::new(2)]),
    );
    store
}

pub(crate) struct Fixture {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) caches: IdentityCaches,
    pub(crate) users: CurrentUserFactory,
    pub(crate) controls: GroupControlFactory,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let store = Arc::new(populated_store());
        let caches = IdentityCaches::new(store.clone(), &IdentityCacheConfig::default());
        let users = CurrentUserFactory::new(caches.clone(), Arc::new(policy()));
        let controls = GroupControlFactory::new(Arc::clone(&caches.groups));
        Self {
            store,
            caches,
            users,
            controls,
        }
    }
}
