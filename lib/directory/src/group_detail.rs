//! Full view of one group.

use crate::account_info::{AccountInfo, AccountInfoCacheFactory};
use crate::error::DirectoryError;
use crate::group_info::{GroupInfo, GroupInfoCacheFactory};
use revu_access::{CurrentUser, GroupControlFactory};
use revu_core::{GroupUuid, Result};
use revu_identity::IdentityCaches;
use rootcause::prelude::ResultExt;
use serde::Serialize;
use tracing::{debug, instrument};

/// A group with its owner, direct members and directly included groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDetail {
    /// The group itself.
    pub group: GroupInfo,
    /// The owner group.
    pub owner: GroupInfo,
    /// Direct members that have an account, ordered by id.
    pub members: Vec<AccountInfo>,
    /// Directly included groups that still resolve, ordered by uuid.
    pub included_groups: Vec<GroupInfo>,
}

/// Builds [`GroupDetail`]s for users allowed to see the group.
#[derive(Debug)]
pub struct GroupDetailFactory<'a> {
    caches: &'a IdentityCaches,
    controls: &'a GroupControlFactory,
}

impl<'a> GroupDetailFactory<'a> {
    /// Creates a factory reading through `caches` and checking visibility
    /// with `controls`.
    #[must_use]
    pub fn new(caches: &'a IdentityCaches, controls: &'a GroupControlFactory) -> Self {
        Self { caches, controls }
    }

    /// Returns the detail of group `uuid` as `user` may see it.
    ///
    /// Members without an account record and included internal groups
    /// that no longer exist are left out.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NoSuchGroup`] if the group does not exist
    /// or `user` may not see it, and [`DirectoryError::LookupFailed`] if a
    /// lookup fails.
    #[instrument(skip(self, user))]
    pub async fn create(
        &self,
        uuid: &GroupUuid,
        user: &CurrentUser,
    ) -> Result<GroupDetail, DirectoryError> {
        let control = self
            .controls
            .validate_for_uuid(user, uuid)
            .await
            .map_err(DirectoryError::from_group)?;
        let group = control.group();

        let mut accounts = AccountInfoCacheFactory::new(&self.caches.accounts);
        for &id in group.members() {
            let state = self
                .caches
                .accounts
                .get(id)
                .await
                .context(DirectoryError::LookupFailed {
                    what: format!("account {id}"),
                })?;
            if state.is_missing() {
                debug!(%id, "skipping member without account");
                continue;
            }
            accounts.want(id).await?;
        }

        let mut groups = GroupInfoCacheFactory::new(&self.caches.groups);
        let mut included_groups = Vec::with_capacity(group.subgroups().len());
        for subgroup in group.subgroups() {
            let info = groups.get(subgroup).await?;
            if info.id.is_none() && subgroup.is_internal() {
                debug!(%subgroup, "skipping stale included group");
                continue;
            }
            included_groups.push(info);
        }

        Ok(GroupDetail {
            group: groups.get(group.uuid()).await?,
            owner: groups.get(group.owner_group_uuid()).await?,
            members: accounts.create(),
            included_groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, uuid};
    use revu_core::AccountId;
    use revu_identity::SystemGroups;

    #[tokio::test]
    async fn detail_lists_owner_members_and_included_groups() {
        let fixture = Fixture::new();
        let factory = GroupDetailFactory::new(&fixture.caches, &fixture.controls);
        let lead = fixture.users.identified(AccountId::new(2)).await.unwrap();

        let detail = factory.create(&uuid("r"), &lead).await.unwrap();

        assert_eq!(detail.group.name, "R");
        assert_eq!(detail.group.description.as_deref(), Some("Release managers"));
        assert_eq!(detail.owner.name, "Leads");
        let members: Vec<_> = detail.members.iter().map(|m| m.account_id).collect();
        assert_eq!(members, vec![AccountId::new(2)]);
        let included: Vec<_> = detail.included_groups.iter().map(|g| g.uuid.clone()).collect();
        assert_eq!(
            included,
            vec![SystemGroups::registered_users(), uuid("ldap:cn=ext"), uuid("r2")]
        );
    }

    #[tokio::test]
    async fn stale_included_group_is_filtered() {
        let fixture = Fixture::new();
        let factory = GroupDetailFactory::new(&fixture.caches, &fixture.controls);
        let admin = fixture.users.identified(AccountId::new(1)).await.unwrap();

        let detail = factory.create(&uuid("r"), &admin).await.unwrap();
        assert!(detail.included_groups.iter().all(|g| g.uuid != uuid("gone")));
    }

    #[tokio::test]
    async fn members_without_account_are_skipped() {
        let fixture = Fixture::new();
        let factory = GroupDetailFactory::new(&fixture.caches, &fixture.controls);
        let admin = fixture.users.identified(AccountId::new(1)).await.unwrap();

        let detail = factory.create(&uuid("r2"), &admin).await.unwrap();
        let members: Vec<_> = detail.members.iter().map(|m| m.account_id).collect();
        assert_eq!(members, vec![AccountId::new(3)]);
    }

    #[tokio::test]
    async fn hidden_group_is_no_such_group() {
        let fixture = Fixture::new();
        let factory = GroupDetailFactory::new(&fixture.caches, &fixture.controls);
        let anonymous = fixture.users.anonymous();

        let err = factory.create(&uuid("r"), &anonymous).await.unwrap_err();
        assert!(matches!(err.current_context(), DirectoryError::NoSuchGroup { .. }));
    }

    #[tokio::test]
    async fn detail_serializes_without_absent_fields() {
        let fixture = Fixture::new();
        let factory = GroupDetailFactory::new(&fixture.caches, &fixture.controls);
        let admin = fixture.users.identified(AccountId::new(1)).await.unwrap();

        let detail = factory.create(&uuid("admins"), &admin).await.unwrap();
        let json = serde_json::to_value(&detail).expect("serialize");
        assert_eq!(json["owner"]["uuid"], "admins");
        assert_eq!(json["members"][0]["username"], "alice");
        assert_eq!(json["included_groups"], serde_json::json!([]));
    }
}
