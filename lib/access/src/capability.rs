//! Server-wide capabilities granted to groups.
//!
//! Capabilities are granted to groups, never to accounts directly. A user
//! holds a capability when any group granted it is among the user's
//! effective groups. Administrators hold every capability.

use revu_core::{GroupUuid, Result, StoreError};
use revu_membership::GroupMembership;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A server-wide capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalCapability {
    /// Full control over the server. Implies every other capability.
    AdministrateServer,
    /// Create new groups.
    CreateGroup,
    /// Modify other users' accounts.
    ModifyAccount,
    /// See every account, not only those sharing a group.
    ViewAllAccounts,
}

impl GlobalCapability {
    /// Every capability.
    pub const ALL: [Self; 4] = [
        Self::AdministrateServer,
        Self::CreateGroup,
        Self::ModifyAccount,
        Self::ViewAllAccounts,
    ];

    /// Returns the configuration name of the capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdministrateServer => "administrate_server",
            Self::CreateGroup => "create_group",
            Self::ModifyAccount => "modify_account",
            Self::ViewAllAccounts => "view_all_accounts",
        }
    }
}

impl fmt::Display for GlobalCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Groups granted each capability, as configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CapabilityConfig {
    /// Groups granted [`GlobalCapability::AdministrateServer`].
    #[serde(default)]
    pub administrators: Vec<GroupUuid>,

    /// Groups granted [`GlobalCapability::CreateGroup`].
    #[serde(default)]
    pub group_creators: Vec<GroupUuid>,

    /// Groups granted [`GlobalCapability::ModifyAccount`].
    #[serde(default)]
    pub account_modifiers: Vec<GroupUuid>,

    /// Groups granted [`GlobalCapability::ViewAllAccounts`].
    #[serde(default)]
    pub account_viewers: Vec<GroupUuid>,
}

/// Maps capabilities to the groups holding them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityPolicy {
    grants: BTreeMap<GlobalCapability, BTreeSet<GroupUuid>>,
}

impl CapabilityPolicy {
    /// Creates a policy granting nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a policy from configuration.
    #[must_use]
    pub fn from_config(config: &CapabilityConfig) -> Self {
        let mut policy = Self::none();
        let configured = [
            (GlobalCapability::AdministrateServer, &config.administrators),
            (GlobalCapability::CreateGroup, &config.group_creators),
            (GlobalCapability::ModifyAccount, &config.account_modifiers),
            (GlobalCapability::ViewAllAccounts, &config.account_viewers),
        ];
        for (capability, groups) in configured {
            for group in groups {
                policy.grant(capability, group.clone());
            }
        }
        policy
    }

    /// Grants `capability` to `group`.
    pub fn grant(&mut self, capability: GlobalCapability, group: GroupUuid) {
        self.grants.entry(capability).or_default().insert(group);
    }

    /// Returns a copy of this policy with `capability` granted to `group`.
    #[must_use]
    pub fn with_grant(mut self, capability: GlobalCapability, group: GroupUuid) -> Self {
        self.grant(capability, group);
        self
    }

    /// Returns every group holding `capability`, including administrators.
    #[must_use]
    pub fn groups_holding(&self, capability: GlobalCapability) -> BTreeSet<GroupUuid> {
        let mut groups = self.granted(capability).clone();
        if capability != GlobalCapability::AdministrateServer {
            groups.extend(self.granted(GlobalCapability::AdministrateServer).iter().cloned());
        }
        groups
    }

    /// Returns true if `membership` includes a group holding `capability`.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the membership fails.
    pub async fn allows(
        &self,
        capability: GlobalCapability,
        membership: &mut GroupMembership,
    ) -> Result<bool, StoreError> {
        let groups = self.groups_holding(capability);
        if groups.is_empty() {
            return Ok(false);
        }
        membership.contains_any_of(&groups).await
    }

    fn granted(&self, capability: GlobalCapability) -> &BTreeSet<GroupUuid> {
        static EMPTY: BTreeSet<GroupUuid> = BTreeSet::new();
        self.grants.get(&capability).unwrap_or(&EMPTY)
    }
}
