//! Strongly-typed identity keys for accounts and groups.
//!
//! Accounts and groups carry integer ids assigned by the backing store.
//! Groups additionally carry a [`GroupUuid`], the stable key used for
//! ownership and membership comparisons across renames.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed integer ID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Creates an ID from its integer value.
            #[must_use]
            pub const fn new(value: i32) -> Self {
                Self(value)
            }

            /// Returns the integer value.
            #[must_use]
            pub const fn get(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self).map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    reason: e.to_string(),
                })
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a person's account.
    AccountId
);

define_id!(
    /// Internal identifier for a group.
    ///
    /// Legacy key; prefer [`GroupUuid`] for anything compared across renames.
    GroupId
);

/// Stable identifier of a group.
///
/// Internal groups use opaque identifiers without a scheme. Groups owned by
/// another backend are prefixed with a scheme, e.g. `global:Registered-Users`
/// or `ldap:cn=reviewers`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupUuid(String);

impl GroupUuid {
    /// Scheme prefix used by the built-in system groups.
    pub const SYSTEM_SCHEME: &'static str = "global:";

    /// Creates a group UUID from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty or only whitespace.
    pub fn parse(uuid: impl Into<String>) -> Result<Self, ParseIdError> {
        let uuid = uuid.into();
        if uuid.trim().is_empty() {
            return Err(ParseIdError {
                id_type: "GroupUuid",
                reason: "group uuid must not be empty".to_string(),
            });
        }
        Ok(Self(uuid))
    }

    /// Creates the UUID of a built-in system group.
    #[must_use]
    pub fn system(name: &str) -> Self {
        Self(format!("{}{name}", Self::SYSTEM_SCHEME))
    }

    /// Generates a fresh UUID for a newly created internal group.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    /// Returns the UUID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this group is stored by the internal group backend.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        !self.0.contains(':')
    }

    /// Returns true if this is one of the built-in system groups.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.0.starts_with(Self::SYSTEM_SCHEME)
    }
}

impl fmt::Display for GroupUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GroupUuid {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for GroupUuid {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<GroupUuid> for String {
    fn from(uuid: GroupUuid) -> Self {
        uuid.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_display_format() {
        let id = AccountId::new(1000042);
        assert_eq!(id.to_string(), "1000042");
    }

    #[test]
    fn parse_account_id() {
        let id: AccountId = " 1000001 ".parse().expect("should parse");
        assert_eq!(id.get(), 1000001);
    }

    #[test]
    fn parse_invalid_group_id() {
        let result: Result<GroupId, _> = "not_a_number".parse();
        let err = result.unwrap_err();
        assert_eq!(err.id_type, "GroupId");
    }

    #[test]
    fn id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(AccountId::new(1));
        set.insert(AccountId::new(2));
        set.insert(AccountId::new(1)); // duplicate

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn empty_group_uuid_is_rejected() {
        assert!(GroupUuid::parse("").is_err());
        assert!(GroupUuid::parse("   ").is_err());
    }

    #[test]
    fn generated_uuids_are_internal_and_unique() {
        let a = GroupUuid::generate();
        let b = GroupUuid::generate();
        assert_ne!(a, b);
        assert!(a.is_internal());
        assert!(!a.is_system());
    }

    #[test]
    fn scheme_classifies_group_uuids() {
        let system = GroupUuid::parse("global:Registered-Users").expect("valid");
        let external = GroupUuid::parse("ldap:cn=reviewers").expect("valid");
        let internal = GroupUuid::parse("6a1e70e1a88782771a91808c8af9bbb7a9871389").expect("valid");

        assert!(system.is_system());
        assert!(!system.is_internal());
        assert!(!external.is_system());
        assert!(!external.is_internal());
        assert!(internal.is_internal());
    }

    #[test]
    fn system_uuid_has_scheme() {
        let uuid = GroupUuid::system("Anonymous-Users");
        assert_eq!(uuid.as_str(), "global:Anonymous-Users");
        assert!(uuid.is_system());
    }

    #[test]
    fn group_uuid_deserialization_rejects_empty() {
        let parsed: Result<GroupUuid, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let parsed: GroupUuid = serde_json::from_str("\"abc\"").expect("deserialize");
        assert_eq!(parsed.as_str(), "abc");
    }
}
