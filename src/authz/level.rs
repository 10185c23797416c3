use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AuthzError;

/// Access level a principal holds on an entity.
///
/// The derive order is the permission order: `None < Read < Write < Admin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    None,
    Read,
    Write,
    Admin,
}

impl PermissionLevel {
    /// Decodes the integer stored in the grant and link share tables.
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(PermissionLevel::None),
            1 => Some(PermissionLevel::Read),
            2 => Some(PermissionLevel::Write),
            3 => Some(PermissionLevel::Admin),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            PermissionLevel::None => 0,
            PermissionLevel::Read => 1,
            PermissionLevel::Write => 2,
            PermissionLevel::Admin => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
            PermissionLevel::Admin => "admin",
        }
    }

    /// True if this level satisfies `required`.
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self >= required
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(PermissionLevel::None),
            "read" => Ok(PermissionLevel::Read),
            "write" => Ok(PermissionLevel::Write),
            "admin" => Ok(PermissionLevel::Admin),
            other => Err(AuthzError::invalid_level(format!("unknown level `{other}`"))),
        }
    }
}

/// Operation a caller wants to perform on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    /// Create a child inside the target container.
    Create,
    Update,
    Delete,
    /// Manage grants and link shares on the target.
    Share,
}

impl Capability {
    pub fn required_level(self) -> PermissionLevel {
        match self {
            Capability::Read => PermissionLevel::Read,
            Capability::Create | Capability::Update | Capability::Delete => PermissionLevel::Write,
            Capability::Share => PermissionLevel::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::Share => "share",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Capability::Read),
            "create" => Ok(Capability::Create),
            "update" => Ok(Capability::Update),
            "delete" => Ok(Capability::Delete),
            "share" => Ok(Capability::Share),
            other => Err(AuthzError::invalid_input(format!("unknown capability `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        assert!(PermissionLevel::None < PermissionLevel::Read);
        assert!(PermissionLevel::Read < PermissionLevel::Write);
        assert!(PermissionLevel::Write < PermissionLevel::Admin);
        assert!(PermissionLevel::Admin.satisfies(PermissionLevel::Write));
        assert!(!PermissionLevel::Read.satisfies(PermissionLevel::Write));
    }

    #[test]
    fn stored_integers_round_trip_and_reject_unknown() {
        for level in [PermissionLevel::Read, PermissionLevel::Write, PermissionLevel::Admin] {
            assert_eq!(PermissionLevel::from_i64(level.as_i64()), Some(level));
        }
        assert_eq!(PermissionLevel::from_i64(7), None);
        assert_eq!(PermissionLevel::from_i64(-1), None);
    }

    #[test]
    fn capabilities_map_to_levels() {
        assert_eq!(Capability::Read.required_level(), PermissionLevel::Read);
        assert_eq!(Capability::Create.required_level(), PermissionLevel::Write);
        assert_eq!(Capability::Update.required_level(), PermissionLevel::Write);
        assert_eq!(Capability::Delete.required_level(), PermissionLevel::Write);
        assert_eq!(Capability::Share.required_level(), PermissionLevel::Admin);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Write".parse::<PermissionLevel>().unwrap(), PermissionLevel::Write);
        assert_eq!(" delete ".parse::<Capability>().unwrap(), Capability::Delete);
        assert!(matches!("owner".parse::<PermissionLevel>(), Err(AuthzError::InvalidLevel(_))));
        assert!(matches!("archive".parse::<Capability>(), Err(AuthzError::InvalidInput(_))));
    }
}
