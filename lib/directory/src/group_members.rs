//! Transitive member listing.

use crate::error::DirectoryError;
use revu_access::{CurrentUser, GroupControlFactory};
use revu_core::{AccountId, GroupUuid, Result};
use revu_identity::{Account, IdentityCaches};
use revu_membership::GroupIncludeIndex;
use rootcause::prelude::ResultExt;
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::{debug, instrument};

/// Lists the accounts a group grants membership to.
#[derive(Debug)]
pub struct GroupMembersFactory<'a> {
    caches: &'a IdentityCaches,
    controls: &'a GroupControlFactory,
}

impl<'a> GroupMembersFactory<'a> {
    /// Creates a factory reading through `caches` and checking visibility
    /// with `controls`.
    #[must_use]
    pub fn new(caches: &'a IdentityCaches, controls: &'a GroupControlFactory) -> Self {
        Self { caches, controls }
    }

    /// Returns every account that is a member of `root`, directly or
    /// through included groups, ordered by account id.
    ///
    /// Each included group is expanded once, so inclusion cycles
    /// terminate. Members without an account record are left out.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NoSuchGroup`] if `root` does not exist or
    /// `user` may not see it, and [`DirectoryError::LookupFailed`] if a
    /// lookup fails.
    #[instrument(skip(self, user))]
    pub async fn list_accounts(
        &self,
        root: &GroupUuid,
        user: &CurrentUser,
    ) -> Result<Vec<Account>, DirectoryError> {
        self.controls
            .validate_for_uuid(user, root)
            .await
            .map_err(DirectoryError::from_group)?;

        let member_ids = self.member_ids(root).await?;
        let mut accounts = Vec::with_capacity(member_ids.len());
        for id in member_ids {
            let state = self
                .caches
                .accounts
                .get(id)
                .await
                .context(DirectoryError::LookupFailed {
                    what: format!("account {id}"),
                })?;
            match state.account() {
                Some(account) => accounts.push(account.clone()),
                None => debug!(%id, "skipping member without account"),
            }
        }
        Ok(accounts)
    }

    async fn member_ids(&self, root: &GroupUuid) -> Result<BTreeSet<AccountId>, DirectoryError> {
        let lookup_failed = |group: &GroupUuid| DirectoryError::LookupFailed {
            what: format!("group {group}"),
        };

        let mut members = BTreeSet::new();
        let mut visited = HashSet::from([root.clone()]);
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(group) = queue.pop_front() {
            let direct = self
                .caches
                .includes
                .members_of(&group)
                .await
                .context(lookup_failed(&group))?;
            members.extend(direct.iter().copied());

            let subgroups = self
                .caches
                .includes
                .subgroups_of(&group)
                .await
                .context(lookup_failed(&group))?;
            for subgroup in subgroups.iter() {
                if visited.insert(subgroup.clone()) {
                    queue.push_back(subgroup.clone());
                }
            }
        }
        debug!(groups = visited.len(), members = members.len(), "expanded members");
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, uuid};

    fn ids(accounts: &[Account]) -> Vec<AccountId> {
        accounts.iter().map(Account::id).collect()
    }

    #[tokio::test]
    async fn cyclic_inclusion_lists_each_member_once() {
        let fixture = Fixture::new();
        let factory = GroupMembersFactory::new(&fixture.caches, &fixture.controls);
        let lead = fixture.users.identified(AccountId::new(2)).await.unwrap();

        let from_r = factory.list_accounts(&uuid("r"), &lead).await.unwrap();
        let from_r2 = factory.list_accounts(&uuid("r2"), &lead).await.unwrap();

        assert_eq!(ids(&from_r), vec![AccountId::new(2), AccountId::new(3)]);
        assert_eq!(ids(&from_r), ids(&from_r2));
    }

    #[tokio::test]
    async fn each_group_is_expanded_once() {
        let fixture = Fixture::new();
        let factory = GroupMembersFactory::new(&fixture.caches, &fixture.controls);
        let admin = fixture.users.identified(AccountId::new(1)).await.unwrap();
        let before = fixture.store.calls();

        factory.list_accounts(&uuid("r"), &admin).await.unwrap();

        // r, r2 and the stale gone; external and system uuids never reach
        // the store.
        let after = fixture.store.calls();
        assert_eq!(after.load_group_members - before.load_group_members, 3);
    }

    #[tokio::test]
    async fn members_without_account_are_skipped() {
        let fixture = Fixture::new();
        let factory = GroupMembersFactory::new(&fixture.caches, &fixture.controls);
        let admin = fixture.users.identified(AccountId::new(1)).await.unwrap();

        let members = factory.list_accounts(&uuid("r2"), &admin).await.unwrap();
        assert!(!ids(&members).contains(&AccountId::new(42)));
    }

    #[tokio::test]
    async fn invisible_root_is_no_such_group() {
        let fixture = Fixture::new();
        let factory = GroupMembersFactory::new(&fixture.caches, &fixture.controls);
        let outsider = fixture.users.identified(AccountId::new(3)).await.unwrap();

        let err = factory.list_accounts(&uuid("r"), &outsider).await.unwrap_err();
        assert!(matches!(err.current_context(), DirectoryError::NoSuchGroup { .. }));

        let err = factory.list_accounts(&uuid("nope"), &outsider).await.unwrap_err();
        assert!(matches!(err.current_context(), DirectoryError::NoSuchGroup { .. }));
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let fixture = Fixture::new();
        let factory = GroupMembersFactory::new(&fixture.caches, &fixture.controls);
        let admin = fixture.users.identified(AccountId::new(1)).await.unwrap();
        fixture.store.set_unavailable(true);

        let err = factory.list_accounts(&uuid("r"), &admin).await.unwrap_err();
        assert!(matches!(err.current_context(), DirectoryError::LookupFailed { .. }));
    }
}
