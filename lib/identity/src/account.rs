//! Account records and their cached projection.

use chrono::{DateTime, Utc};
use revu_core::{AccountId, GroupUuid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A person's account as held by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    preferred_email: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default = "Utc::now")]
    registered_on: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Account {
    /// Creates an active account registered now.
    #[must_use]
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            full_name: None,
            preferred_email: None,
            username: None,
            active: true,
            registered_on: Utc::now(),
        }
    }

    /// Sets the full name.
    #[must_use]
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Sets the preferred email address.
    #[must_use]
    pub fn with_preferred_email(mut self, email: impl Into<String>) -> Self {
        self.preferred_email = Some(email.into());
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets whether the account may sign in.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns the account ID.
    #[must_use]
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Returns the full name, if set.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    /// Returns the preferred email address, if set.
    #[must_use]
    pub fn preferred_email(&self) -> Option<&str> {
        self.preferred_email.as_deref()
    }

    /// Returns the username, if set.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns true if the account may sign in.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns when the account was registered.
    #[must_use]
    pub fn registered_on(&self) -> DateTime<Utc> {
        self.registered_on
    }

    /// Returns the best human-readable name: full name, then username,
    /// then the account id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| format!("account {}", self.id))
    }
}

/// Cached projection of an account.
///
/// Immutable once built; the cache replaces it wholesale after eviction.
/// An account the store does not know is represented by
/// [`AccountState::missing`] rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    account_id: AccountId,
    account: Option<Account>,
    internal_groups: BTreeSet<GroupUuid>,
}

impl AccountState {
    /// Creates the state of an existing account.
    #[must_use]
    pub fn new(account: Account, internal_groups: BTreeSet<GroupUuid>) -> Self {
        Self {
            account_id: account.id(),
            account: Some(account),
            internal_groups,
        }
    }

    /// Creates the sentinel for an account the store does not have.
    #[must_use]
    pub fn missing(account_id: AccountId) -> Self {
        Self {
            account_id,
            account: None,
            internal_groups: BTreeSet::new(),
        }
    }

    /// Returns the account ID that was looked up.
    #[must_use]
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Returns the account, or `None` for the missing sentinel.
    #[must_use]
    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Returns true if this is the missing sentinel.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.account.is_none()
    }

    /// Returns true if the account exists and may sign in.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.account.as_ref().is_some_and(Account::is_active)
    }

    /// Returns the internal groups the account directly belongs to.
    #[must_use]
    pub fn internal_groups(&self) -> &BTreeSet<GroupUuid> {
        &self.internal_groups
    }
}
