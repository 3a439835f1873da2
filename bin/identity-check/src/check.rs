//! Queries answered by the tool.

use crate::error::CheckError;
use clap::Subcommand;
use revu_access::CurrentUser;
use revu_core::{AccountId, GroupUuid, Result};
use revu_directory::IdentityService;
use revu_identity::{InMemoryStore, StoreSnapshot};
use serde_json::{Value, json};
use std::path::Path;
use tracing::{debug, instrument};

/// A query against the loaded fixture.
#[derive(Subcommand, Debug, Clone)]
pub enum Query {
    /// Check whether an account is a member of a group, transitively
    Member {
        /// Account id
        #[arg(long)]
        account: AccountId,
        /// Group uuid
        #[arg(long)]
        group: GroupUuid,
    },
    /// List every group an account is a member of, transitively
    Groups {
        /// Account id
        #[arg(long)]
        account: AccountId,
    },
    /// Show a group with its owner, members and included groups
    Detail {
        /// Group uuid
        #[arg(long)]
        group: GroupUuid,
        /// Act as this account instead of the server itself
        #[arg(long = "as")]
        as_account: Option<AccountId>,
    },
    /// List every account a group grants membership to
    Members {
        /// Group uuid
        #[arg(long)]
        group: GroupUuid,
        /// Act as this account instead of the server itself
        #[arg(long = "as")]
        as_account: Option<AccountId>,
    },
}

/// Reads a JSON store snapshot from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a snapshot.
pub fn load_fixture(path: &Path) -> Result<InMemoryStore, CheckError> {
    let fixture_error = |details: String| CheckError::Fixture {
        path: path.display().to_string(),
        details,
    };
    let contents = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
    let snapshot: StoreSnapshot =
        serde_json::from_str(&contents).map_err(|e| fixture_error(e.to_string()))?;
    debug!(
        accounts = snapshot.accounts.len(),
        groups = snapshot.groups.len(),
        "loaded fixture"
    );
    Ok(InMemoryStore::from_snapshot(snapshot))
}

/// Answers `query` as JSON.
///
/// # Errors
///
/// Returns an error if the query fails.
#[instrument(skip(service))]
pub async fn run(service: &IdentityService, query: &Query) -> Result<Value, CheckError> {
    match query {
        Query::Member { account, group } => {
            let user = user(service, Some(*account)).await?;
            let member = user.is_member_of(group).await.map_err(query_error)?;
            Ok(json!({ "account_id": account, "group": group, "member": member }))
        }
        Query::Groups { account } => {
            let user = user(service, Some(*account)).await?;
            let groups = user
                .effective_groups()
                .await
                .known_groups()
                .await
                .map_err(query_error)?;
            Ok(json!({ "account_id": account, "groups": groups }))
        }
        Query::Detail { group, as_account } => {
            let user = user(service, *as_account).await?;
            let detail = service
                .group_detail(group, &user)
                .await
                .map_err(query_error)?;
            Ok(serde_json::to_value(detail).map_err(query_error)?)
        }
        Query::Members { group, as_account } => {
            let user = user(service, *as_account).await?;
            let accounts = service
                .group_members(group, &user)
                .await
                .map_err(query_error)?;
            Ok(serde_json::to_value(accounts).map_err(query_error)?)
        }
    }
}

async fn user(
    service: &IdentityService,
    account: Option<AccountId>,
) -> Result<CurrentUser, CheckError> {
    match account {
        Some(id) => Ok(service.user_for(id).await.map_err(query_error)?),
        None => Ok(service.internal_user()),
    }
}

fn query_error(error: impl std::fmt::Display) -> CheckError {
    CheckError::Query {
        details: error.to_string(),
    }
}
