//! Invitation accept saga and invite expiry.

use std::time::Duration;

use seatkeeper_entity::invite::InviteKey;
use seatkeeper_entity::license::{Product, ProductSelection};
use seatkeeper_entity::workspace::WorkspaceRole;
use seatkeeper_service::{FailureKind, InviteRequest, LicenseError, RequestContext};

use crate::helpers::TestApp;

fn invite_for(email: &str, products: &[Product]) -> InviteRequest {
    InviteRequest {
        email: email.into(),
        role: WorkspaceRole::Member,
        products: ProductSelection::from_products(products),
    }
}

#[tokio::test]
async fn test_accept_grants_every_requested_product() {
    let app = TestApp::with_plan(&[(Product::Remote, 3), (Product::Drive, 3)]).await;
    let invitee = app.identity.add_account("new@example.com", "New");

    let invites = app
        .services
        .memberships
        .invite(
            &app.owner_ctx(),
            app.workspace_id,
            vec![invite_for("new@example.com", &[Product::Remote, Product::Drive])],
        )
        .await
        .unwrap();
    assert_eq!(app.notifier.templates(), vec!["invitation"]);

    let membership = app
        .services
        .memberships
        .accept(&RequestContext::new(invitee.id), &invites[0].key())
        .await
        .unwrap();
    assert_eq!(membership.user_id, invitee.id);
    assert_eq!(
        app.services
            .pool
            .held_products(app.workspace_id, invitee.id)
            .await
            .unwrap(),
        vec![Product::Remote, Product::Drive]
    );
    assert!(
        app.services
            .invites
            .find(&InviteKey::session(invites[0].session_code.clone()))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_accept_is_all_or_nothing() {
    let app = TestApp::with_plan(&[
        (Product::Remote, 3),
        (Product::Meeting, 1),
        (Product::Drive, 3),
    ])
    .await;
    let holder = app.add_member("holder@example.com").await;
    app.services
        .pool
        .grant(app.workspace_id, Product::Meeting, holder.id)
        .await
        .unwrap();
    let invitee = app.identity.add_account("new@example.com", "New");

    app.services
        .memberships
        .invite(
            &app.owner_ctx(),
            app.workspace_id,
            vec![invite_for(
                "new@example.com",
                &[Product::Remote, Product::Meeting, Product::Drive],
            )],
        )
        .await
        .unwrap();
    let key = InviteKey::member(invitee.id, app.workspace_id);

    let err = app
        .services
        .memberships
        .accept(&RequestContext::new(invitee.id), &key)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::PartialFailure);
    assert!(
        app.services
            .pool
            .held_products(app.workspace_id, invitee.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(app.services.invites.find(&key).await.unwrap().is_none());
    assert_eq!(app.seats_in_use().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_invite_expires_after_ttl() {
    let app = TestApp::with_plan(&[(Product::Remote, 3)]).await;
    let invitee = app.identity.add_account("late@example.com", "Late");
    app.services
        .memberships
        .invite(
            &app.owner_ctx(),
            app.workspace_id,
            vec![invite_for("late@example.com", &[Product::Remote])],
        )
        .await
        .unwrap();
    let key = InviteKey::member(invitee.id, app.workspace_id);
    assert!(app.services.invites.find(&key).await.unwrap().is_some());

    tokio::time::advance(app.services.invites.ttl() + Duration::from_secs(1)).await;

    assert!(app.services.invites.find(&key).await.unwrap().is_none());
    assert!(matches!(
        app.services
            .memberships
            .accept(&RequestContext::new(invitee.id), &key)
            .await,
        Err(LicenseError::InviteNotFound)
    ));
    assert_eq!(app.seats_in_use().await, 0);
}
