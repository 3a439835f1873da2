//! Per-group access control.
//!
//! Visibility and every group mutation follow a single rule: the caller
//! must own the group, i.e. belong to its owner group, or administer the
//! server. The persisted visible-to-all flag is not consulted.

use crate::error::GroupError;
use crate::user::CurrentUser;
use revu_core::{GroupId, GroupUuid, Result};
use revu_identity::{GroupCache, InternalGroup};
use rootcause::prelude::ResultExt;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// What a user may do with one group.
///
/// Ownership is evaluated once, when the control is built; later changes
/// to the user's memberships are not observed.
pub struct GroupControl<'a> {
    user: &'a CurrentUser,
    group: Arc<InternalGroup>,
    is_owner: bool,
}

impl<'a> GroupControl<'a> {
    /// Builds the control of `user` over `group`.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::LookupFailed`] if resolving the user's
    /// memberships fails.
    #[instrument(skip_all, fields(group = %group.uuid()))]
    pub async fn new(user: &'a CurrentUser, group: Arc<InternalGroup>) -> Result<Self, GroupError> {
        let lookup_failed = GroupError::LookupFailed {
            group: group.uuid().to_string(),
        };
        let is_owner = user
            .is_member_of(group.owner_group_uuid())
            .await
            .context(lookup_failed.clone())?
            || user
                .can_administrate_server()
                .await
                .context(lookup_failed)?;
        debug!(is_owner, "group control built");
        Ok(Self {
            user,
            group,
            is_owner,
        })
    }

    /// Returns the user this control is for.
    #[must_use]
    pub fn user(&self) -> &'a CurrentUser {
        self.user
    }

    /// Returns the controlled group.
    #[must_use]
    pub fn group(&self) -> &Arc<InternalGroup> {
        &self.group
    }

    /// Returns true if the user owns the group or administers the server.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Returns true if the user may see the group.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.is_owner
    }

    /// Returns true if the user may add accounts to the group.
    #[must_use]
    pub fn can_add_member(&self) -> bool {
        self.is_owner
    }

    /// Returns true if the user may remove accounts from the group.
    #[must_use]
    pub fn can_remove_member(&self) -> bool {
        self.is_owner
    }

    /// Returns true if the user may include another group.
    #[must_use]
    pub fn can_add_group(&self) -> bool {
        self.is_owner
    }

    /// Returns true if the user may remove an included group.
    #[must_use]
    pub fn can_remove_group(&self) -> bool {
        self.is_owner
    }

    /// Returns true if the user may list the group's members.
    #[must_use]
    pub fn can_see_member(&self) -> bool {
        self.is_owner
    }
}

impl fmt::Debug for GroupControl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupControl")
            .field("user", &self.user.kind())
            .field("group", self.group.uuid())
            .field("is_owner", &self.is_owner)
            .finish()
    }
}

/// Resolves groups and builds [`GroupControl`]s for them.
#[derive(Debug, Clone)]
pub struct GroupControlFactory {
    groups: Arc<GroupCache>,
}

impl GroupControlFactory {
    /// Creates a factory resolving groups through `groups`.
    #[must_use]
    pub fn new(groups: Arc<GroupCache>) -> Self {
        Self { groups }
    }

    /// Builds the control of `user` over the group with id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::NoSuchGroup`] if the group does not exist and
    /// [`GroupError::LookupFailed`] if a lookup fails.
    pub async fn control_for<'a>(
        &self,
        user: &'a CurrentUser,
        id: GroupId,
    ) -> Result<GroupControl<'a>, GroupError> {
        let group = id.to_string();
        let found = self.groups.get(id).await.context(GroupError::LookupFailed {
            group: group.clone(),
        })?;
        Self::control_of(user, found, group).await
    }

    /// Builds the control of `user` over the group with uuid `uuid`.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::NoSuchGroup`] if the group does not exist and
    /// [`GroupError::LookupFailed`] if a lookup fails.
    pub async fn control_for_uuid<'a>(
        &self,
        user: &'a CurrentUser,
        uuid: &GroupUuid,
    ) -> Result<GroupControl<'a>, GroupError> {
        let group = uuid.to_string();
        let found = self
            .groups
            .get_by_uuid(uuid)
            .await
            .context(GroupError::LookupFailed {
                group: group.clone(),
            })?;
        Self::control_of(user, found, group).await
    }

    /// Like [`control_for`](Self::control_for), but a group the user may
    /// not see is reported as missing.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::NoSuchGroup`] if the group does not exist or
    /// is not visible, and [`GroupError::LookupFailed`] if a lookup fails.
    #[instrument(skip(self, user))]
    pub async fn validate_for<'a>(
        &self,
        user: &'a CurrentUser,
        id: GroupId,
    ) -> Result<GroupControl<'a>, GroupError> {
        Self::visible(self.control_for(user, id).await?, id.to_string())
    }

    /// Like [`control_for_uuid`](Self::control_for_uuid), but a group the
    /// user may not see is reported as missing.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::NoSuchGroup`] if the group does not exist or
    /// is not visible, and [`GroupError::LookupFailed`] if a lookup fails.
    #[instrument(skip(self, user))]
    pub async fn validate_for_uuid<'a>(
        &self,
        user: &'a CurrentUser,
        uuid: &GroupUuid,
    ) -> Result<GroupControl<'a>, GroupError> {
        Self::visible(self.control_for_uuid(user, uuid).await?, uuid.to_string())
    }

    async fn control_of<'a>(
        user: &'a CurrentUser,
        found: Option<Arc<InternalGroup>>,
        group: String,
    ) -> Result<GroupControl<'a>, GroupError> {
        let Some(found) = found else {
            return Err(GroupError::NoSuchGroup { group }.into());
        };
        GroupControl::new(user, found).await
    }

    fn visible(control: GroupControl<'_>, group: String) -> Result<GroupControl<'_>, GroupError> {
        if !control.is_visible() {
            debug!(%group, "group not visible");
            return Err(GroupError::NoSuchGroup { group }.into());
        }
        Ok(control)
    }
}
