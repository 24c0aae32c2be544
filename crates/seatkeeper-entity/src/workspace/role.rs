//! Workspace role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a member can hold inside a workspace.
///
/// Ordered by privilege level: Owner > Manager > Member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "workspace_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkspaceRole {
    /// The workspace owner; exactly one per workspace.
    Owner,
    /// Can invite, revise and remove members.
    Manager,
    /// Ordinary member.
    Member,
}

impl WorkspaceRole {
    /// Return the privilege level (higher = more privileged).
    pub fn privilege_level(&self) -> u8 {
        match self {
            Self::Owner => 3,
            Self::Manager => 2,
            Self::Member => 1,
        }
    }

    /// Whether this role is the owner role.
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }

    /// Whether this role may manage other members.
    pub fn can_manage_members(&self) -> bool {
        self.privilege_level() >= Self::Manager.privilege_level()
    }

    /// Return the role as its stored string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Manager => "MANAGER",
            Self::Member => "MEMBER",
        }
    }
}

impl fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspaceRole {
    type Err = seatkeeper_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OWNER" => Ok(Self::Owner),
            "MANAGER" => Ok(Self::Manager),
            "MEMBER" => Ok(Self::Member),
            _ => Err(seatkeeper_core::AppError::validation(format!(
                "Invalid workspace role: '{s}'. Expected one of: owner, manager, member"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manage_rights() {
        assert!(WorkspaceRole::Owner.can_manage_members());
        assert!(WorkspaceRole::Manager.can_manage_members());
        assert!(!WorkspaceRole::Member.can_manage_members());
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "manager".parse::<WorkspaceRole>().unwrap(),
            WorkspaceRole::Manager
        );
        assert!("admin".parse::<WorkspaceRole>().is_err());
    }
}
