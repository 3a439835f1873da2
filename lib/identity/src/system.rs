//! Built-in groups every installation has.
//!
//! System groups have no internal record and no stored members: membership
//! follows from who the user is, so they are added to a user's seed groups
//! rather than looked up.

use crate::group::GroupDescription;
use revu_core::GroupUuid;

const ANONYMOUS_USERS: &str = "Anonymous-Users";
const REGISTERED_USERS: &str = "Registered-Users";

/// The built-in system groups.
#[derive(Debug, Clone, Copy)]
pub struct SystemGroups;

impl SystemGroups {
    /// Every user, signed in or not.
    #[must_use]
    pub fn anonymous_users() -> GroupUuid {
        GroupUuid::system(ANONYMOUS_USERS)
    }

    /// Every user signed in with an account.
    #[must_use]
    pub fn registered_users() -> GroupUuid {
        GroupUuid::system(REGISTERED_USERS)
    }

    /// Describes a system group, or `None` if `uuid` is not one.
    #[must_use]
    pub fn describe(uuid: &GroupUuid) -> Option<GroupDescription> {
        let name = match uuid.as_str().strip_prefix(GroupUuid::SYSTEM_SCHEME)? {
            ANONYMOUS_USERS => "Anonymous Users",
            REGISTERED_USERS => "Registered Users",
            _ => return None,
        };
        Some(GroupDescription::external(uuid.clone(), name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_groups_are_described() {
        let anonymous = SystemGroups::describe(&SystemGroups::anonymous_users()).expect("known");
        assert_eq!(anonymous.name(), "Anonymous Users");
        assert!(anonymous.internal_group().is_none());
        assert!(!anonymous.is_stale());

        let registered = SystemGroups::describe(&SystemGroups::registered_users()).expect("known");
        assert_eq!(registered.name(), "Registered Users");
    }

    #[test]
    fn other_uuids_are_not_system_groups() {
        let unknown = GroupUuid::system("Project-Owners");
        assert!(SystemGroups::describe(&unknown).is_none());
        let internal = GroupUuid::parse("abc").expect("valid");
        assert!(SystemGroups::describe(&internal).is_none());
    }
}
