//! Bulk account provisioning.

use seatkeeper_entity::license::{Product, ProductSelection};
use seatkeeper_entity::workspace::WorkspaceRole;
use seatkeeper_service::{FailureKind, ProvisionRequest};

use crate::helpers::TestApp;

fn provision(email: &str, products: &[Product]) -> ProvisionRequest {
    ProvisionRequest {
        email: email.into(),
        name: email.into(),
        role: WorkspaceRole::Member,
        products: ProductSelection::from_products(products),
    }
}

#[tokio::test]
async fn test_second_account_failure_keeps_first() {
    let app = TestApp::with_plan(&[(Product::Remote, 1), (Product::Meeting, 5)]).await;

    let err = app
        .services
        .memberships
        .provision_accounts(
            &app.owner_ctx(),
            app.workspace_id,
            vec![
                provision("first@example.com", &[Product::Remote, Product::Meeting]),
                provision("second@example.com", &[Product::Remote]),
            ],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::PartialFailure);

    let first = app.identity.account_by_email("first@example.com").unwrap();
    assert!(app.identity.contains(first.id));
    assert_eq!(
        app.services
            .pool
            .held_products(app.workspace_id, first.id)
            .await
            .unwrap(),
        vec![Product::Remote, Product::Meeting]
    );

    assert!(app.identity.account_by_email("second@example.com").is_none());
    let deleted = app.identity.deleted();
    assert_eq!(deleted.len(), 1);
    assert!(
        app.services
            .pool
            .held_products(app.workspace_id, deleted[0])
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(app.seats_in_use().await, 2);
}
