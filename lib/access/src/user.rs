//! The user a request acts for.

use crate::capability::{CapabilityPolicy, GlobalCapability};
use revu_core::{AccountId, GroupUuid, Result, StoreError};
use revu_identity::{AccountState, IdentityCaches, SystemGroups};
use revu_membership::GroupMembership;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

/// Who a [`CurrentUser`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKind {
    /// Not signed in.
    Anonymous,
    /// Signed in with an account.
    Identified(AccountId),
    /// The server itself, acting outside any request.
    Internal,
}

/// The user a request acts for, with its effective groups.
///
/// Effective groups are resolved lazily and memoized for the lifetime of
/// the user, so a `CurrentUser` belongs to one request. The membership is
/// kept behind a mutex so the user can be shared by reference within the
/// request.
#[derive(Debug)]
pub struct CurrentUser {
    kind: UserKind,
    policy: Arc<CapabilityPolicy>,
    membership: Mutex<GroupMembership>,
}

impl CurrentUser {
    /// Creates a user with an explicit membership.
    #[must_use]
    pub fn new(kind: UserKind, membership: GroupMembership, policy: Arc<CapabilityPolicy>) -> Self {
        Self {
            kind,
            policy,
            membership: Mutex::new(membership),
        }
    }

    /// Creates a user who is not signed in.
    #[must_use]
    pub fn anonymous(policy: Arc<CapabilityPolicy>) -> Self {
        Self::new(
            UserKind::Anonymous,
            GroupMembership::list([SystemGroups::anonymous_users()]),
            policy,
        )
    }

    /// Creates the server's own user. It belongs to no group and holds
    /// every capability.
    #[must_use]
    pub fn internal(policy: Arc<CapabilityPolicy>) -> Self {
        Self::new(UserKind::Internal, GroupMembership::empty(), policy)
    }

    /// Returns who this user is.
    #[must_use]
    pub fn kind(&self) -> UserKind {
        self.kind
    }

    /// Returns the account of an identified user.
    #[must_use]
    pub fn account_id(&self) -> Option<AccountId> {
        match self.kind {
            UserKind::Identified(id) => Some(id),
            UserKind::Anonymous | UserKind::Internal => None,
        }
    }

    /// Returns the user's effective groups.
    ///
    /// Holds the membership lock until the guard is dropped.
    pub async fn effective_groups(&self) -> MutexGuard<'_, GroupMembership> {
        self.membership.lock().await
    }

    /// Returns true if `group` is one of the user's effective groups.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the membership fails.
    pub async fn is_member_of(&self, group: &GroupUuid) -> Result<bool, StoreError> {
        self.effective_groups().await.contains(group).await
    }

    /// Returns true if the user holds `capability`.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the membership fails.
    #[instrument(skip(self), fields(user = ?self.kind))]
    pub async fn has_capability(&self, capability: GlobalCapability) -> Result<bool, StoreError> {
        if self.kind == UserKind::Internal {
            return Ok(true);
        }
        let mut membership = self.effective_groups().await;
        let allowed = self.policy.allows(capability, &mut membership).await?;
        debug!(allowed, "capability check");
        Ok(allowed)
    }

    /// Returns true if the user administers the server.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the membership fails.
    pub async fn is_administrator(&self) -> Result<bool, StoreError> {
        self.can_administrate_server().await
    }

    /// Returns true if the user holds [`GlobalCapability::AdministrateServer`].
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the membership fails.
    pub async fn can_administrate_server(&self) -> Result<bool, StoreError> {
        self.has_capability(GlobalCapability::AdministrateServer).await
    }

    /// Returns true if the user may create groups.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the membership fails.
    pub async fn can_create_group(&self) -> Result<bool, StoreError> {
        self.has_capability(GlobalCapability::CreateGroup).await
    }

    /// Returns true if the user may modify other accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the membership fails.
    pub async fn can_modify_account(&self) -> Result<bool, StoreError> {
        self.has_capability(GlobalCapability::ModifyAccount).await
    }

    /// Returns true if the user may see every account.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the membership fails.
    pub async fn can_view_all_accounts(&self) -> Result<bool, StoreError> {
        self.has_capability(GlobalCapability::ViewAllAccounts).await
    }
}

/// Builds [`CurrentUser`]s whose effective groups follow group inclusion.
#[derive(Debug, Clone)]
pub struct CurrentUserFactory {
    caches: IdentityCaches,
    policy: Arc<CapabilityPolicy>,
}

impl CurrentUserFactory {
    /// Creates a factory over `caches`, granting capabilities per `policy`.
    #[must_use]
    pub fn new(caches: IdentityCaches, policy: Arc<CapabilityPolicy>) -> Self {
        Self { caches, policy }
    }

    /// Returns the capability policy users are built with.
    #[must_use]
    pub fn policy(&self) -> &Arc<CapabilityPolicy> {
        &self.policy
    }

    /// Creates a user who is not signed in.
    #[must_use]
    pub fn anonymous(&self) -> CurrentUser {
        CurrentUser::anonymous(Arc::clone(&self.policy))
    }

    /// Creates the server's own user.
    #[must_use]
    pub fn internal(&self) -> CurrentUser {
        CurrentUser::internal(Arc::clone(&self.policy))
    }

    /// Creates the user signed in as `account_id`.
    ///
    /// The effective groups are the account's direct groups, both system
    /// groups, and every group including those transitively. An account
    /// the store does not know gets the system groups only.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the account fails.
    #[instrument(skip(self))]
    pub async fn identified(&self, account_id: AccountId) -> Result<CurrentUser, StoreError> {
        let state = self.caches.accounts.get(account_id).await?;
        Ok(self.for_state(&state))
    }

    /// Creates the user for an already loaded account state.
    #[must_use]
    pub fn for_state(&self, state: &AccountState) -> CurrentUser {
        let seed = state
            .internal_groups()
            .iter()
            .cloned()
            .chain([SystemGroups::anonymous_users(), SystemGroups::registered_users()]);
        let membership = GroupMembership::materialized(self.caches.includes.clone(), seed);
        CurrentUser::new(
            UserKind::Identified(state.account_id()),
            membership,
            Arc::clone(&self.policy),
        )
    }
}
