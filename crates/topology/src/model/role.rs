//! Node group roles

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::ModelError;

/// Role tag of a node group
///
/// Parsed case-insensitively; always displayed upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Cluster coordination / quorum
    Manager,
    /// Data storage and query serving
    Data,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "MANAGER",
            Role::Data => "DATA",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MANAGER" => Ok(Role::Manager),
            "DATA" => Ok(Role::Data),
            _ => Err(ModelError::UnknownRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Set of roles carried by a node group
pub type RoleSet = BTreeSet<Role>;

/// Parse role tags, ignoring case and duplicates
pub fn parse_roles<I, S>(tags: I) -> Result<RoleSet, ModelError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter().map(|tag| tag.as_ref().parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("Data".parse::<Role>().unwrap(), Role::Data);
        assert_eq!("MANAGER".parse::<Role>().unwrap(), Role::Manager);
        assert!(matches!(
            "coordinator".parse::<Role>(),
            Err(ModelError::UnknownRole(tag)) if tag == "coordinator"
        ));
    }

    #[test]
    fn test_parse_roles_collapses_duplicates() {
        let roles = parse_roles(["data", "DATA", "Manager"]).unwrap();
        assert_eq!(roles.len(), 2);
        assert!(roles.contains(&Role::Manager));
    }

    #[test]
    fn test_serde_uses_upper_case_tags() {
        let json = serde_json::to_string(&Role::Manager).unwrap();
        assert_eq!(json, "\"MANAGER\"");
        let role: Role = serde_json::from_str("\"data\"").unwrap();
        assert_eq!(role, Role::Data);
    }
}
