//! Request-scoped batch resolution of account summaries.

use crate::error::DirectoryError;
use revu_core::{AccountId, Result};
use revu_identity::{AccountCache, AccountState};
use rootcause::prelude::ResultExt;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Public summary of an account.
///
/// An account the store does not have is summarized by its id alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    /// Account id.
    pub account_id: AccountId,
    /// Full name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Preferred email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<&AccountState> for AccountInfo {
    fn from(state: &AccountState) -> Self {
        let account = state.account();
        Self {
            account_id: state.account_id(),
            name: account.and_then(|a| a.full_name()).map(str::to_string),
            email: account.and_then(|a| a.preferred_email()).map(str::to_string),
            username: account.and_then(|a| a.username()).map(str::to_string),
        }
    }
}

/// Collects [`AccountInfo`]s for one response.
///
/// Each account is resolved at most once, however often it is asked for.
/// [`create`](Self::create) lists accounts in the order they were first
/// asked for.
#[derive(Debug)]
pub struct AccountInfoCacheFactory<'a> {
    accounts: &'a AccountCache,
    index: HashMap<AccountId, usize>,
    infos: Vec<AccountInfo>,
}

impl<'a> AccountInfoCacheFactory<'a> {
    /// Creates an empty factory resolving through `accounts`.
    #[must_use]
    pub fn new(accounts: &'a AccountCache) -> Self {
        Self {
            accounts,
            index: HashMap::new(),
            infos: Vec::new(),
        }
    }

    /// Resolves `id` unless it already was.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the account fails.
    pub async fn want(&mut self, id: AccountId) -> Result<(), DirectoryError> {
        self.resolve(id).await.map(|_| ())
    }

    /// Resolves every id in `ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if loading any account fails.
    pub async fn want_all(
        &mut self,
        ids: impl IntoIterator<Item = AccountId>,
    ) -> Result<(), DirectoryError> {
        for id in ids {
            self.want(id).await?;
        }
        Ok(())
    }

    /// Resolves `id` unless it already was, and returns its summary.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the account fails.
    pub async fn get(&mut self, id: AccountId) -> Result<AccountInfo, DirectoryError> {
        let position = self.resolve(id).await?;
        Ok(self.infos[position].clone())
    }

    /// Returns every resolved summary, in first-asked order.
    #[must_use]
    pub fn create(&self) -> Vec<AccountInfo> {
        self.infos.clone()
    }

    async fn resolve(&mut self, id: AccountId) -> Result<usize, DirectoryError> {
        if let Some(position) = self.index.get(&id) {
            return Ok(*position);
        }
        let state = self.accounts.get(id).await.context(DirectoryError::LookupFailed {
            what: format!("account {id}"),
        })?;
        let position = match self.index.entry(id) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                self.infos.push(AccountInfo::from(state.as_ref()));
                *entry.insert(self.infos.len() - 1)
            }
        };
        Ok(position)
    }
}
