//! Pending invitation TTL records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::license::{Product, ProductSelection};
use crate::workspace::WorkspaceRole;

/// How a pending invitation is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InviteKey {
    /// By invited user and workspace (`{invitedUserId}-{workspaceId}`).
    Member {
        /// Invited user.
        user_id: Uuid,
        /// Target workspace.
        workspace_id: Uuid,
    },
    /// By the opaque alphanumeric session code sent in the invitation.
    Session {
        /// Session code.
        code: String,
    },
}

impl InviteKey {
    /// Member-addressed key.
    pub fn member(user_id: Uuid, workspace_id: Uuid) -> Self {
        Self::Member {
            user_id,
            workspace_id,
        }
    }

    /// Session-code-addressed key.
    pub fn session(code: impl Into<String>) -> Self {
        Self::Session { code: code.into() }
    }
}

impl fmt::Display for InviteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member {
                user_id,
                workspace_id,
            } => write!(f, "{user_id}-{workspace_id}"),
            Self::Session { code } => f.write_str(code),
        }
    }
}

/// Saga state of an invitation that was sent but not yet answered.
///
/// Holds no seat: accepting it is what grants seats, so expiry needs no
/// compensation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInvite {
    /// Invited user.
    pub invitee_id: Uuid,
    /// Invited user's email address.
    pub invitee_email: String,
    /// Target workspace.
    pub workspace_id: Uuid,
    /// User who sent the invitation.
    pub inviter_id: Uuid,
    /// Role to assign on acceptance.
    pub role: WorkspaceRole,
    /// Products to grant on acceptance.
    #[serde(flatten)]
    pub products: ProductSelection,
    /// Alias code carried by the invitation notification.
    pub session_code: String,
    /// When the invite was first sent.
    pub created_at: DateTime<Utc>,
    /// When the invite was last (re-)sent.
    pub updated_at: DateTime<Utc>,
    /// When the record stops being readable.
    pub expires_at: DateTime<Utc>,
}

impl PendingInvite {
    /// The member-addressed key of this invite.
    pub fn key(&self) -> InviteKey {
        InviteKey::member(self.invitee_id, self.workspace_id)
    }

    /// Requested products in grant order.
    pub fn requested_products(&self) -> Vec<Product> {
        self.products.products()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_key_display() {
        let key = InviteKey::member(Uuid::nil(), Uuid::nil());
        assert_eq!(
            key.to_string(),
            "00000000-0000-0000-0000-000000000000-00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(InviteKey::session("abc").to_string(), "abc");
    }

    #[test]
    fn test_flags_flatten_in_json() {
        let now = Utc::now();
        let invite = PendingInvite {
            invitee_id: Uuid::nil(),
            invitee_email: "a@example.com".into(),
            workspace_id: Uuid::nil(),
            inviter_id: Uuid::nil(),
            role: WorkspaceRole::Member,
            products: ProductSelection {
                remote: true,
                meeting: false,
                drive: true,
            },
            session_code: "code".into(),
            created_at: now,
            updated_at: now,
            expires_at: now,
        };
        let value = serde_json::to_value(&invite).unwrap();
        assert_eq!(value["remote"], true);
        assert_eq!(value["meeting"], false);
        let back: PendingInvite = serde_json::from_value(value).unwrap();
        assert_eq!(back, invite);
    }
}
