//! Role changes and seat revisions for existing members.

use tracing::info;
use uuid::Uuid;

use seatkeeper_client::Notification;
use seatkeeper_entity::license::{Product, ProductSelection};
use seatkeeper_entity::workspace::{Membership, WorkspaceRole};

use super::MembershipOrchestrator;
use crate::context::RequestContext;
use crate::error::LicenseError;
use crate::saga::Saga;

impl MembershipOrchestrator {
    /// Change a member's role. Owner only; the owner role itself can be
    /// neither assigned nor taken away here.
    pub async fn change_role(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
        target_id: Uuid,
        role: WorkspaceRole,
    ) -> Result<Membership, LicenseError> {
        let actor = self.require_member(workspace_id, ctx.user_id).await?;
        if !actor.role.is_owner() {
            return Err(LicenseError::Forbidden(
                "only the owner can change roles".into(),
            ));
        }
        if role.is_owner() {
            return Err(LicenseError::InvalidRole(
                "ownership cannot be assigned by a role change".into(),
            ));
        }
        let target = self.require_member(workspace_id, target_id).await?;
        if target.role.is_owner() {
            return Err(LicenseError::Forbidden(
                "the owner's role cannot be changed".into(),
            ));
        }

        if !self
            .members
            .update_role(workspace_id, target_id, role)
            .await?
        {
            return Err(LicenseError::MemberNotFound {
                workspace_id,
                user_id: target_id,
            });
        }
        info!(
            workspace_id = %workspace_id,
            user_id = %target_id,
            from = %target.role,
            to = %role,
            "Member role changed"
        );

        if let Some(to) = self.email_of(target_id).await {
            self.notify(Notification::RoleChanged {
                to,
                workspace_id,
                role,
            })
            .await;
        }
        Ok(Membership { role, ..target })
    }

    /// Replace the set of products a member holds.
    ///
    /// Newly selected products are granted first, then deselected ones are
    /// revoked; any failure unwinds the changes already made.
    pub async fn revise_products(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
        target_id: Uuid,
        selection: ProductSelection,
    ) -> Result<Vec<Product>, LicenseError> {
        if selection.is_empty() {
            return Err(LicenseError::NoLicenseSelected);
        }
        self.require_manager(ctx, workspace_id).await?;
        self.require_member(workspace_id, target_id).await?;

        let held = self.pool.held_products(workspace_id, target_id).await?;
        let wanted = selection.products();
        let added: Vec<Product> = wanted.iter().copied().filter(|p| !held.contains(p)).collect();
        let removed: Vec<Product> = held.iter().copied().filter(|p| !wanted.contains(p)).collect();
        if added.is_empty() && removed.is_empty() {
            return Ok(wanted);
        }

        let mut saga = Saga::new("revise_products");
        self.grant_all(&mut saga, workspace_id, target_id, &added)
            .await?;
        for product in removed.iter().copied() {
            saga.step(
                format!("revoke {product}"),
                self.pool.revoke(workspace_id, product, target_id),
                move |_| async move {
                    self.pool
                        .grant(workspace_id, product, target_id)
                        .await
                        .map(|_| ())
                },
            )
            .await?;
        }
        saga.finish();

        info!(
            workspace_id = %workspace_id,
            user_id = %target_id,
            added = ?added,
            removed = ?removed,
            "Member products revised"
        );
        Ok(wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::membership::fixtures::Harness;

    #[tokio::test]
    async fn test_revise_swaps_products() {
        let h = Harness::new(&[(Product::Remote, 3), (Product::Meeting, 3)]).await;
        let member = h.add_member("m@example.com", WorkspaceRole::Member).await;
        h.pool
            .grant(h.workspace_id, Product::Remote, member.id)
            .await
            .unwrap();

        let products = h
            .orchestrator
            .revise_products(
                &h.owner_ctx(),
                h.workspace_id,
                member.id,
                ProductSelection::from_products(&[Product::Meeting]),
            )
            .await
            .unwrap();
        assert_eq!(products, vec![Product::Meeting]);
        assert_eq!(
            h.pool.held_products(h.workspace_id, member.id).await.unwrap(),
            vec![Product::Meeting]
        );
    }

    #[tokio::test]
    async fn test_empty_selection_rejected_before_mutation() {
        let h = Harness::new(&[(Product::Remote, 3)]).await;
        let member = h.add_member("m@example.com", WorkspaceRole::Member).await;
        h.pool
            .grant(h.workspace_id, Product::Remote, member.id)
            .await
            .unwrap();

        let err = h
            .orchestrator
            .revise_products(
                &h.owner_ctx(),
                h.workspace_id,
                member.id,
                ProductSelection::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Validation);
        assert_eq!(
            h.pool.held_products(h.workspace_id, member.id).await.unwrap(),
            vec![Product::Remote]
        );
    }

    #[tokio::test]
    async fn test_failed_grant_leaves_holdings_unchanged() {
        let h = Harness::new(&[(Product::Remote, 3), (Product::Drive, 1)]).await;
        let member = h.add_member("m@example.com", WorkspaceRole::Member).await;
        let other = h.add_member("o@example.com", WorkspaceRole::Member).await;
        h.pool
            .grant(h.workspace_id, Product::Remote, member.id)
            .await
            .unwrap();
        h.pool
            .grant(h.workspace_id, Product::Drive, other.id)
            .await
            .unwrap();

        let err = h
            .orchestrator
            .revise_products(
                &h.owner_ctx(),
                h.workspace_id,
                member.id,
                ProductSelection::from_products(&[Product::Drive]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LicenseError::NoSeatAvailable { .. }));
        assert_eq!(
            h.pool.held_products(h.workspace_id, member.id).await.unwrap(),
            vec![Product::Remote]
        );
    }

    #[tokio::test]
    async fn test_change_role_rules() {
        let h = Harness::new(&[(Product::Remote, 3)]).await;
        let member = h.add_member("m@example.com", WorkspaceRole::Member).await;

        let updated = h
            .orchestrator
            .change_role(&h.owner_ctx(), h.workspace_id, member.id, WorkspaceRole::Manager)
            .await
            .unwrap();
        assert_eq!(updated.role, WorkspaceRole::Manager);
        assert_eq!(h.notifier.templates(), vec!["role_changed"]);

        assert!(matches!(
            h.orchestrator
                .change_role(&h.owner_ctx(), h.workspace_id, member.id, WorkspaceRole::Owner)
                .await,
            Err(LicenseError::InvalidRole(_))
        ));
        assert!(matches!(
            h.orchestrator
                .change_role(
                    &RequestContext::new(member.id),
                    h.workspace_id,
                    h.owner.id,
                    WorkspaceRole::Member
                )
                .await,
            Err(LicenseError::Forbidden(_))
        ));
    }
}
