//! Notification collaborator and the templated messages it delivers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use seatkeeper_entity::workspace::WorkspaceRole;

use crate::error::ClientError;

/// A templated email. The template name is the serde tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Notification {
    /// Invitation to join a workspace.
    Invitation {
        /// Recipient email.
        to: String,
        /// Target workspace.
        workspace_id: Uuid,
        /// Who sent the invite.
        inviter_id: Uuid,
        /// Code the recipient presents to accept or reject.
        session_code: String,
        /// When the invitation lapses.
        expires_at: DateTime<Utc>,
    },
    /// The workspace was full when the invitation was accepted.
    InviteCapacityRejected {
        /// Recipient email.
        to: String,
        /// Target workspace.
        workspace_id: Uuid,
    },
    /// A workflow failed midway and was rolled back.
    PartialFailure {
        /// Recipient email.
        to: String,
        /// Affected workspace.
        workspace_id: Uuid,
        /// Workflow name.
        saga: String,
        /// Step that failed.
        step: String,
    },
    /// The recipient no longer belongs to the workspace.
    RemovedFromWorkspace {
        /// Recipient email.
        to: String,
        /// Workspace left.
        workspace_id: Uuid,
    },
    /// The recipient's role changed.
    RoleChanged {
        /// Recipient email.
        to: String,
        /// Workspace.
        workspace_id: Uuid,
        /// New role.
        role: WorkspaceRole,
    },
}

impl Notification {
    /// Recipient email address.
    pub fn recipient(&self) -> &str {
        match self {
            Self::Invitation { to, .. }
            | Self::InviteCapacityRejected { to, .. }
            | Self::PartialFailure { to, .. }
            | Self::RemovedFromWorkspace { to, .. }
            | Self::RoleChanged { to, .. } => to,
        }
    }

    /// Template name.
    pub fn template(&self) -> &'static str {
        match self {
            Self::Invitation { .. } => "invitation",
            Self::InviteCapacityRejected { .. } => "invite_capacity_rejected",
            Self::PartialFailure { .. } => "partial_failure",
            Self::RemovedFromWorkspace { .. } => "removed_from_workspace",
            Self::RoleChanged { .. } => "role_changed",
        }
    }
}

/// Email delivery.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_tag_matches_name() {
        let n = Notification::RoleChanged {
            to: "m@example.com".into(),
            workspace_id: Uuid::nil(),
            role: WorkspaceRole::Manager,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["template"], n.template());
        assert_eq!(n.recipient(), "m@example.com");
    }
}
