//! Seat pool grant, revoke and quantity reduction.

use seatkeeper_entity::license::{Product, ProductStatus, SeatStatus};
use seatkeeper_service::LicenseError;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_grant_then_revoke_restores_usage() {
    let app = TestApp::with_plan(&[(Product::Remote, 2), (Product::Meeting, 2), (Product::Drive, 2)])
        .await;
    let user = app.add_member("user@example.com").await;

    for product in Product::ALL {
        let before = app.seats_in_use().await;
        let seat = app
            .services
            .pool
            .grant(app.workspace_id, product, user.id)
            .await
            .unwrap();
        assert_eq!(app.seats_in_use().await, before + 1);

        app.services
            .pool
            .revoke(app.workspace_id, product, user.id)
            .await
            .unwrap();
        assert_eq!(app.seats_in_use().await, before);

        let row = app
            .store
            .seats_of(seat.product_id)
            .await
            .into_iter()
            .find(|s| s.id == seat.id)
            .unwrap();
        assert_eq!(row.status, SeatStatus::Unuse);
        assert!(row.user_id.is_none());
    }
}

#[tokio::test]
async fn test_seat_reuse_after_revoke() {
    let app = TestApp::with_plan(&[(Product::Remote, 2)]).await;
    let a = app.add_member("a@example.com").await;
    let b = app.add_member("b@example.com").await;
    let c = app.add_member("c@example.com").await;
    let pool = &app.services.pool;

    let seat_a = pool.grant(app.workspace_id, Product::Remote, a.id).await.unwrap();
    pool.grant(app.workspace_id, Product::Remote, b.id).await.unwrap();
    assert!(matches!(
        pool.grant(app.workspace_id, Product::Remote, c.id).await,
        Err(LicenseError::NoSeatAvailable { .. })
    ));

    pool.revoke(app.workspace_id, Product::Remote, a.id).await.unwrap();
    let seat_c = pool.grant(app.workspace_id, Product::Remote, c.id).await.unwrap();
    assert_eq!(seat_c.id, seat_a.id);
    assert_eq!(seat_c.user_id, Some(c.id));
}

#[tokio::test]
async fn test_active_pool_never_over_allocated() {
    let app = TestApp::with_plan(&[(Product::Drive, 3)]).await;
    let mut members = Vec::new();
    for i in 0..5 {
        members.push(app.add_member(&format!("m{i}@example.com")).await);
    }

    for member in &members {
        let _ = app
            .services
            .pool
            .grant(app.workspace_id, Product::Drive, member.id)
            .await;
        let usage = app.services.pool.usage(app.workspace_id).await.unwrap();
        for product in usage.products {
            if product.status == ProductStatus::Active {
                assert!(product.in_use <= product.quantity);
            }
        }
    }
    assert_eq!(app.seats_in_use().await, 3);
}

#[tokio::test]
async fn test_reduction_below_usage_exceeds_then_heals() {
    let app = TestApp::with_plan(&[(Product::Remote, 3)]).await;
    let a = app.add_member("a@example.com").await;
    let b = app.add_member("b@example.com").await;
    let pool = &app.services.pool;

    let seat_a = pool.grant(app.workspace_id, Product::Remote, a.id).await.unwrap();
    pool.grant(app.workspace_id, Product::Remote, b.id).await.unwrap();

    let status = pool
        .reduce_quantity(app.workspace_id, Product::Remote, 1)
        .await
        .unwrap();
    assert_eq!(status, ProductStatus::Exceeded);
    assert!(matches!(
        pool.grant(app.workspace_id, Product::Remote, app.owner.id).await,
        Err(LicenseError::ProductNotActive { .. })
    ));

    pool.revoke(app.workspace_id, Product::Remote, a.id).await.unwrap();

    let usage = pool.usage(app.workspace_id).await.unwrap();
    let remote = &usage.products[0];
    assert_eq!(remote.status, ProductStatus::Active);
    assert_eq!(remote.in_use, 1);
    assert_eq!(remote.quantity, 1);

    let row = app
        .store
        .seats_of(seat_a.product_id)
        .await
        .into_iter()
        .find(|s| s.id == seat_a.id)
        .unwrap();
    assert_eq!(row.status, SeatStatus::Terminate);
    assert!(row.user_id.is_none());
}
