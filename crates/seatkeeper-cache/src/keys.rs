//! Key builders for every entry Seatkeeper keeps in the TTL store.

use uuid::Uuid;

// ── Invitations ────────────────────────────────────────────

/// Main key of a pending invitation: `invite:{invitedUserId}-{workspaceId}`.
pub fn invite_member(user_id: Uuid, workspace_id: Uuid) -> String {
    format!("invite:{user_id}-{workspace_id}")
}

/// Alias key resolving an invitation session code to its main key.
pub fn invite_session(code: &str) -> String {
    format!("invite-code:{code}")
}

/// Pattern matching every pending invitation into a workspace.
pub fn invite_workspace_pattern(workspace_id: Uuid) -> String {
    format!("invite:*-{workspace_id}")
}

// ── Allocation authorizations ──────────────────────────────

/// Key of a single-use allocation authorization.
pub fn allocation_authorization(code: &str) -> String {
    format!("alloc-auth:{code}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_pattern_covers_member_keys() {
        let user = Uuid::new_v4();
        let workspace = Uuid::new_v4();
        let key = invite_member(user, workspace);
        let pattern = invite_workspace_pattern(workspace);
        let suffix = pattern.trim_start_matches("invite:*");
        assert!(key.starts_with("invite:"));
        assert!(key.ends_with(suffix));
        assert!(!invite_session("abc").starts_with("invite:"));
    }
}
