//! Allocation authorization issue and consume.

use seatkeeper_entity::license::{Product, PurchasedProduct};
use seatkeeper_service::{AllocationOutcome, LicenseError};

use crate::helpers::TestApp;

#[tokio::test]
async fn test_token_is_single_use() {
    let app = TestApp::new().await;
    let authorization = app
        .services
        .authorizations
        .issue_check(
            app.owner.id,
            app.workspace_id,
            &[PurchasedProduct::new(Product::Remote, 2)],
        )
        .await
        .unwrap();
    let request = app.purchase(&[(Product::Remote, 2)]);

    let outcome = app
        .services
        .authorizations
        .consume(&authorization.code, &request)
        .await
        .unwrap();
    assert!(matches!(outcome, AllocationOutcome::Opened(_)));

    assert!(matches!(
        app.services
            .authorizations
            .consume(&authorization.code, &request)
            .await,
        Err(LicenseError::AuthorizationInvalid)
    ));
}

#[tokio::test]
async fn test_top_up_through_authorization() {
    let app = TestApp::with_plan(&[(Product::Remote, 1)]).await;
    let authorization = app
        .services
        .authorizations
        .issue_check(
            app.owner.id,
            app.workspace_id,
            &[PurchasedProduct::new(Product::Drive, 2)],
        )
        .await
        .unwrap();

    let outcome = app
        .services
        .authorizations
        .consume(&authorization.code, &app.purchase(&[(Product::Drive, 2)]))
        .await
        .unwrap();
    assert!(matches!(outcome, AllocationOutcome::ToppedUp(_)));

    let caps = app.services.pool.seat_caps(app.workspace_id).await.unwrap();
    assert_eq!(caps.max_members, 2);
    assert_eq!(caps.products.len(), 2);
}
