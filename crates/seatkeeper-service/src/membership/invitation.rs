//! Invite, accept and reject.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use seatkeeper_client::Notification;
use seatkeeper_entity::account::Account;
use seatkeeper_entity::invite::{InviteKey, PendingInvite};
use seatkeeper_entity::license::ProductSelection;
use seatkeeper_entity::workspace::{MemberType, Membership, WorkspaceRole};

use super::{MembershipOrchestrator, failed_step};
use crate::context::RequestContext;
use crate::error::LicenseError;
use crate::invite::InviteDraft;
use crate::saga::Saga;

/// One invitee in an invite request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteRequest {
    /// Invitee's email address.
    pub email: String,
    /// Role to assign on acceptance.
    pub role: WorkspaceRole,
    /// Products to grant on acceptance.
    #[serde(flatten)]
    pub products: ProductSelection,
}

impl MembershipOrchestrator {
    /// Invite existing accounts into a workspace.
    ///
    /// Validation and the headcount check run before any identity lookup.
    /// Nothing is granted until the invitee accepts.
    pub async fn invite(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
        requests: Vec<InviteRequest>,
    ) -> Result<Vec<PendingInvite>, LicenseError> {
        let inviter = self.require_manager(ctx, workspace_id).await?;
        for request in &requests {
            if request.products.is_empty() {
                return Err(LicenseError::NoLicenseSelected);
            }
            if request.role.is_owner() {
                return Err(LicenseError::InvalidRole(
                    "invitees cannot be given the owner role".into(),
                ));
            }
        }
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        self.check_headcount(workspace_id, requests.len() as i64)
            .await?;

        let mut resolved: Vec<(InviteRequest, Account)> = Vec::with_capacity(requests.len());
        for request in requests {
            let account = self
                .collaborators
                .identity
                .find_by_email(&request.email)
                .await?
                .ok_or_else(|| LicenseError::UnknownInvitee {
                    email: request.email.clone(),
                })?;
            if self
                .members
                .find_member(workspace_id, account.id)
                .await?
                .is_some()
            {
                return Err(LicenseError::AlreadyMember {
                    workspace_id,
                    user_id: account.id,
                });
            }
            resolved.push((request, account));
        }

        let mut invites = Vec::with_capacity(resolved.len());
        for (request, account) in resolved {
            let invite = self
                .invites
                .upsert(InviteDraft {
                    invitee_id: account.id,
                    invitee_email: account.email,
                    workspace_id,
                    inviter_id: inviter.user_id,
                    role: request.role,
                    products: request.products,
                })
                .await?;
            self.notify(Notification::Invitation {
                to: invite.invitee_email.clone(),
                workspace_id,
                inviter_id: inviter.user_id,
                session_code: invite.session_code.clone(),
                expires_at: invite.expires_at,
            })
            .await;
            invites.push(invite);
        }

        info!(
            workspace_id = %workspace_id,
            inviter_id = %inviter.user_id,
            count = invites.len(),
            "Invitations sent"
        );
        Ok(invites)
    }

    /// Accept an invitation addressed to the caller.
    ///
    /// All-or-nothing: every requested seat is granted before the
    /// membership is created. Whatever the outcome, the invitation is
    /// consumed.
    pub async fn accept(
        &self,
        ctx: &RequestContext,
        key: &InviteKey,
    ) -> Result<Membership, LicenseError> {
        let invite = self
            .invites
            .find(key)
            .await?
            .ok_or(LicenseError::InviteNotFound)?;
        if invite.invitee_id != ctx.user_id {
            return Err(LicenseError::Forbidden(
                "invitation is addressed to another user".into(),
            ));
        }
        let invite = self
            .invites
            .take(&invite.key())
            .await?
            .ok_or(LicenseError::InviteNotFound)?;

        let workspace_id = invite.workspace_id;
        let user_id = invite.invitee_id;
        if self
            .members
            .find_member(workspace_id, user_id)
            .await?
            .is_some()
        {
            return Err(LicenseError::AlreadyMember {
                workspace_id,
                user_id,
            });
        }

        if let Err(e) = self.check_headcount(workspace_id, 1).await {
            if matches!(e, LicenseError::SeatCapacityExceeded { .. }) {
                self.notify(Notification::InviteCapacityRejected {
                    to: invite.invitee_email.clone(),
                    workspace_id,
                })
                .await;
            }
            return Err(e);
        }

        let mut saga = Saga::new("accept_invite");
        let joined = match self.join(&mut saga, &invite).await {
            Ok(membership) => membership,
            Err(e) => {
                self.notify(Notification::PartialFailure {
                    to: invite.invitee_email.clone(),
                    workspace_id,
                    saga: saga.name().to_string(),
                    step: failed_step(&e),
                })
                .await;
                return Err(e);
            }
        };
        saga.finish();

        info!(
            workspace_id = %workspace_id,
            user_id = %user_id,
            role = %joined.role,
            products = ?invite.requested_products(),
            "Invitation accepted"
        );
        Ok(joined)
    }

    async fn join<'a>(
        &'a self,
        saga: &mut Saga<'a>,
        invite: &PendingInvite,
    ) -> Result<Membership, LicenseError> {
        let workspace_id = invite.workspace_id;
        let user_id = invite.invitee_id;
        self.grant_all(saga, workspace_id, user_id, &invite.requested_products())
            .await?;

        let membership = Membership::new(workspace_id, user_id, invite.role, MemberType::Invited);
        saga.run("create membership", async {
            self.members.create_member(&membership).await.map_err(|e| {
                if e.is_conflict() {
                    LicenseError::AlreadyMember {
                        workspace_id,
                        user_id,
                    }
                } else {
                    e.into()
                }
            })
        })
        .await
    }

    /// Decline an invitation. The invitee or a workspace manager may do so.
    pub async fn reject(&self, ctx: &RequestContext, key: &InviteKey) -> Result<(), LicenseError> {
        let invite = self
            .invites
            .find(key)
            .await?
            .ok_or(LicenseError::InviteNotFound)?;
        if invite.invitee_id != ctx.user_id {
            self.require_manager(ctx, invite.workspace_id).await?;
        }
        if !self.invites.delete(&invite.key()).await? {
            return Err(LicenseError::InviteNotFound);
        }
        info!(
            workspace_id = %invite.workspace_id,
            invitee_id = %invite.invitee_id,
            "Invitation rejected"
        );
        Ok(())
    }

    /// Look up a pending invitation (operator inspection).
    pub async fn pending_invite(
        &self,
        key: &InviteKey,
    ) -> Result<Option<PendingInvite>, LicenseError> {
        self.invites.find(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatkeeper_database::store::MembershipStore;
    use seatkeeper_entity::license::Product;

    use crate::context::RequestContext;
    use crate::error::FailureKind;
    use crate::membership::fixtures::Harness;

    fn request(email: &str, products: &[Product]) -> InviteRequest {
        InviteRequest {
            email: email.into(),
            role: WorkspaceRole::Member,
            products: ProductSelection::from_products(products),
        }
    }

    #[tokio::test]
    async fn test_invite_then_accept_grants_all_products() {
        let h = Harness::new(&[(Product::Remote, 2), (Product::Drive, 2)]).await;
        let invitee = h.identity.add_account("bob@example.com", "Bob");

        let invites = h
            .orchestrator
            .invite(
                &h.owner_ctx(),
                h.workspace_id,
                vec![request("bob@example.com", &[Product::Remote, Product::Drive])],
            )
            .await
            .unwrap();
        assert_eq!(h.notifier.templates(), vec!["invitation"]);

        let key = InviteKey::session(invites[0].session_code.clone());
        let membership = h
            .orchestrator
            .accept(&RequestContext::new(invitee.id), &key)
            .await
            .unwrap();
        assert_eq!(membership.member_type, MemberType::Invited);
        assert_eq!(
            h.pool.held_products(h.workspace_id, invitee.id).await.unwrap(),
            vec![Product::Remote, Product::Drive]
        );
        assert!(
            h.orchestrator
                .pending_invite(&invites[0].key())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_invite_validation_precedes_lookups() {
        let h = Harness::new(&[(Product::Remote, 1)]).await;
        h.identity.set_unavailable(true);

        let err = h
            .orchestrator
            .invite(&h.owner_ctx(), h.workspace_id, vec![request("x@example.com", &[])])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Validation);

        // Owner already fills the only slot.
        let err = h
            .orchestrator
            .invite(
                &h.owner_ctx(),
                h.workspace_id,
                vec![request("x@example.com", &[Product::Remote])],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LicenseError::SeatCapacityExceeded { .. }));
    }

    #[tokio::test]
    async fn test_accept_after_workspace_filled_is_rejected() {
        let h = Harness::new(&[(Product::Remote, 2)]).await;
        let bob = h.identity.add_account("bob@example.com", "Bob");
        let invites = h
            .orchestrator
            .invite(
                &h.owner_ctx(),
                h.workspace_id,
                vec![request("bob@example.com", &[Product::Remote])],
            )
            .await
            .unwrap();

        // The last member slot is taken while the invitation is pending.
        h.add_member("carol@example.com", WorkspaceRole::Member).await;

        let err = h
            .orchestrator
            .accept(&RequestContext::new(bob.id), &invites[0].key())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LicenseError::SeatCapacityExceeded {
                max_members: 2,
                current: 2,
                joining: 1
            }
        ));
        assert_eq!(
            h.notifier.templates(),
            vec!["invitation", "invite_capacity_rejected"]
        );
        assert!(
            h.orchestrator
                .pending_invite(&invites[0].key())
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(h.pool.usage(h.workspace_id).await.unwrap().seats_in_use, 0);
        assert!(h.store.find_member(h.workspace_id, bob.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_invitee_and_member_rights() {
        let h = Harness::new(&[(Product::Remote, 5)]).await;
        let err = h
            .orchestrator
            .invite(
                &h.owner_ctx(),
                h.workspace_id,
                vec![request("ghost@example.com", &[Product::Remote])],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LicenseError::UnknownInvitee { .. }));

        let member = h.add_member("m@example.com", WorkspaceRole::Member).await;
        let err = h
            .orchestrator
            .invite(
                &RequestContext::new(member.id),
                h.workspace_id,
                vec![request("m@example.com", &[Product::Remote])],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LicenseError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_accept_by_someone_else_is_forbidden() {
        let h = Harness::new(&[(Product::Remote, 3)]).await;
        h.identity.add_account("bob@example.com", "Bob");
        let invites = h
            .orchestrator
            .invite(
                &h.owner_ctx(),
                h.workspace_id,
                vec![request("bob@example.com", &[Product::Remote])],
            )
            .await
            .unwrap();

        let err = h
            .orchestrator
            .accept(&h.owner_ctx(), &invites[0].key())
            .await
            .unwrap_err();
        assert!(matches!(err, LicenseError::Forbidden(_)));
        assert!(
            h.orchestrator
                .pending_invite(&invites[0].key())
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_reject_consumes_without_granting() {
        let h = Harness::new(&[(Product::Remote, 3)]).await;
        let bob = h.identity.add_account("bob@example.com", "Bob");
        let invites = h
            .orchestrator
            .invite(
                &h.owner_ctx(),
                h.workspace_id,
                vec![request("bob@example.com", &[Product::Remote])],
            )
            .await
            .unwrap();

        let ctx = RequestContext::new(bob.id);
        h.orchestrator.reject(&ctx, &invites[0].key()).await.unwrap();
        assert!(matches!(
            h.orchestrator.accept(&ctx, &invites[0].key()).await,
            Err(LicenseError::InviteNotFound)
        ));
        assert_eq!(h.pool.usage(h.workspace_id).await.unwrap().seats_in_use, 0);
    }
}
