//! Seat grant/revoke, plan lifecycle and usage aggregation.
//!
//! Every mutation of product quantity, product status or seat status goes
//! through [`LicensePoolManager`]; the ACTIVE/EXCEEDED transition logic
//! lives only here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use seatkeeper_core::config::ProductAllowances;
use seatkeeper_core::error::AppError;
use seatkeeper_database::store::LicenseStore;
use seatkeeper_entity::license::{
    LicensePlan, LicenseProduct, NewLicensePlan, PlanStatus, PlanTopUp, PlanUsage, Product,
    ProductStatus, ProductUsage, PurchasedProduct, ResourceTotals, Seat, SeatCaps, SeatStatus,
};

use crate::error::LicenseError;
use crate::pool::purchase::{PurchaseRequest, merge_lines};

/// Seat pool manager.
#[derive(Debug, Clone)]
pub struct LicensePoolManager {
    /// Durable plan/product/seat storage.
    store: Arc<dyn LicenseStore>,
    /// Resources contributed by one seat of each product.
    allowances: ProductAllowances,
}

impl LicensePoolManager {
    /// Creates a new pool manager.
    pub fn new(store: Arc<dyn LicenseStore>, allowances: ProductAllowances) -> Self {
        Self { store, allowances }
    }

    /// Per-seat allowance table.
    pub fn allowances(&self) -> &ProductAllowances {
        &self.allowances
    }

    /// The workspace's active plan, if any.
    pub async fn current_plan(&self, workspace_id: Uuid) -> Result<Option<LicensePlan>, LicenseError> {
        Ok(self.store.find_active_plan(workspace_id).await?)
    }

    /// The workspace's active plan.
    pub async fn active_plan(&self, workspace_id: Uuid) -> Result<LicensePlan, LicenseError> {
        self.current_plan(workspace_id)
            .await?
            .ok_or(LicenseError::PlanNotFound { workspace_id })
    }

    async fn product_pool(
        &self,
        workspace_id: Uuid,
        product: Product,
    ) -> Result<LicenseProduct, LicenseError> {
        let not_found = LicenseError::ProductNotFound {
            workspace_id,
            product,
        };
        let Some(plan) = self.current_plan(workspace_id).await? else {
            return Err(not_found);
        };
        self.store
            .find_product(plan.id, product)
            .await?
            .ok_or(not_found)
    }

    /// Assign a free seat of `product` to `user_id`.
    ///
    /// The oldest UNUSE row is flipped to USE with a compare-and-set; a
    /// concurrent writer that wins the row makes this call fail with
    /// [`LicenseError::NoSeatAvailable`].
    pub async fn grant(
        &self,
        workspace_id: Uuid,
        product: Product,
        user_id: Uuid,
    ) -> Result<Seat, LicenseError> {
        let pool = self.product_pool(workspace_id, product).await?;
        if pool.status != ProductStatus::Active {
            return Err(LicenseError::ProductNotActive {
                product,
                status: pool.status,
            });
        }
        if self.store.find_held_seat(pool.id, user_id).await?.is_some() {
            return Err(LicenseError::AlreadyGranted { user_id, product });
        }

        let in_use = self.store.count_seats(pool.id, SeatStatus::Use).await?;
        if in_use >= i64::from(pool.quantity) {
            return Err(LicenseError::NoSeatAvailable { product });
        }
        let Some(seat) = self.store.first_unused_seat(pool.id).await? else {
            return Err(LicenseError::NoSeatAvailable { product });
        };

        match self
            .store
            .transition_seat(seat.id, SeatStatus::Unuse, SeatStatus::Use, Some(user_id))
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(seat_id = seat.id, product = %product, "Seat taken by a concurrent grant");
                return Err(LicenseError::NoSeatAvailable { product });
            }
            Err(e) if e.is_conflict() => {
                return Err(LicenseError::AlreadyGranted { user_id, product });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            workspace_id = %workspace_id,
            product = %product,
            user_id = %user_id,
            seat_id = seat.id,
            "Seat granted"
        );

        Ok(Seat {
            status: SeatStatus::Use,
            user_id: Some(user_id),
            updated_at: Utc::now(),
            ..seat
        })
    }

    /// Release the seat of `product` held by `user_id`.
    ///
    /// In an EXCEEDED pool the seat is retired to TERMINATE and the pool
    /// returns to ACTIVE once usage is back within quantity.
    pub async fn revoke(
        &self,
        workspace_id: Uuid,
        product: Product,
        user_id: Uuid,
    ) -> Result<(), LicenseError> {
        let pool = self.product_pool(workspace_id, product).await?;
        if pool.status.is_terminal() {
            return Err(LicenseError::ProductNotActive {
                product,
                status: pool.status,
            });
        }
        let seat = self
            .store
            .find_held_seat(pool.id, user_id)
            .await?
            .ok_or(LicenseError::SeatNotFound { user_id, product })?;

        let target = if pool.status == ProductStatus::Exceeded {
            SeatStatus::Terminate
        } else {
            SeatStatus::Unuse
        };
        if !self
            .store
            .transition_seat(seat.id, SeatStatus::Use, target, None)
            .await?
        {
            return Err(LicenseError::SeatNotFound { user_id, product });
        }

        if pool.status == ProductStatus::Exceeded {
            // Concurrent revokes may all have retired their seats.
            let in_use = self.sync_seat_rows(pool.id, pool.quantity).await?;
            if in_use <= i64::from(pool.quantity) {
                self.store
                    .set_product_status(pool.id, ProductStatus::Active)
                    .await?;
                info!(
                    workspace_id = %workspace_id,
                    product = %product,
                    in_use,
                    quantity = pool.quantity,
                    "Usage back within quantity; product ACTIVE"
                );
            }
        }

        info!(
            workspace_id = %workspace_id,
            product = %product,
            user_id = %user_id,
            seat_id = seat.id,
            seat_status = %target,
            "Seat revoked"
        );
        Ok(())
    }

    /// Products of the active plan the user holds a seat of, in product order.
    pub async fn held_products(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Product>, LicenseError> {
        let mut held = self.store.held_products(workspace_id, user_id).await?;
        held.sort();
        Ok(held)
    }

    /// Product pools of the workspace's active plan.
    pub async fn list_products(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<LicenseProduct>, LicenseError> {
        let plan = self.active_plan(workspace_id).await?;
        Ok(self.store.list_products(plan.id).await?)
    }

    async fn product_usage(&self, plan_id: Uuid) -> Result<Vec<ProductUsage>, LicenseError> {
        let pools = self.store.list_products(plan_id).await?;
        let mut usage = Vec::with_capacity(pools.len());
        for pool in pools {
            let in_use = self.store.count_seats(pool.id, SeatStatus::Use).await?;
            usage.push(ProductUsage {
                product: pool.product,
                quantity: i64::from(pool.quantity),
                in_use,
                status: pool.status,
            });
        }
        Ok(usage)
    }

    /// Member cap and per-product usage of the workspace's active plan.
    pub async fn seat_caps(&self, workspace_id: Uuid) -> Result<SeatCaps, LicenseError> {
        let plan = self.active_plan(workspace_id).await?;
        Ok(SeatCaps {
            plan_id: plan.id,
            max_members: i64::from(plan.max_members),
            products: self.product_usage(plan.id).await?,
        })
    }

    /// Resources granted to the seats currently in use across a plan.
    pub async fn recalculate_usage(&self, plan_id: Uuid) -> Result<ResourceTotals, LicenseError> {
        let usage = self.product_usage(plan_id).await?;
        Ok(self.allocated(&usage))
    }

    fn allocated(&self, usage: &[ProductUsage]) -> ResourceTotals {
        usage.iter().fold(ResourceTotals::default(), |acc, u| {
            acc + ResourceTotals::for_seats(&self.allowances, u.product, u.in_use)
        })
    }

    /// Usage report of the workspace's active plan.
    pub async fn usage(&self, workspace_id: Uuid) -> Result<PlanUsage, LicenseError> {
        let plan = self.active_plan(workspace_id).await?;
        let products = self.product_usage(plan.id).await?;
        Ok(PlanUsage {
            plan_id: plan.id,
            workspace_id,
            seats_in_use: products.iter().map(|p| p.in_use).sum(),
            allocated: self.allocated(&products),
            caps: plan.caps(),
            products,
        })
    }

    /// Create the workspace's plan from its first purchase.
    pub async fn open_plan(&self, request: &PurchaseRequest) -> Result<LicensePlan, LicenseError> {
        let lines = request.lines();
        if lines.is_empty() {
            return Err(LicenseError::NoLicenseSelected);
        }
        let max_members = lines
            .iter()
            .map(|l| to_quantity(l.quantity))
            .try_fold(0, |max, q| q.map(|q| max.max(q)))?;

        let plan = self
            .store
            .create_plan(
                &NewLicensePlan {
                    owner_id: request.user_id,
                    workspace_id: request.workspace_id,
                    ends_at: request.ends_at,
                    caps: ResourceTotals::for_products(&self.allowances, &lines),
                    payment_ref: request.payment_ref.clone(),
                    billing_customer_id: request.billing_customer_id.clone(),
                    products: lines,
                },
                max_members,
            )
            .await?;

        info!(
            workspace_id = %plan.workspace_id,
            plan_id = %plan.id,
            max_members = plan.max_members,
            "License plan opened"
        );
        Ok(plan)
    }

    /// Add purchased seats and resources to an existing plan.
    ///
    /// The whole purchase is applied in one store transaction, so a failed
    /// top-up leaves neither seats nor the payment reference behind. A
    /// redelivered purchase is a no-op returning the plan unchanged.
    pub async fn top_up(
        &self,
        plan: &LicensePlan,
        payment_ref: &str,
        deltas: &[PurchasedProduct],
        ends_at: DateTime<Utc>,
    ) -> Result<LicensePlan, LicenseError> {
        let lines = merge_lines(deltas);
        if lines.is_empty() {
            return Err(LicenseError::NoLicenseSelected);
        }
        if plan.status != PlanStatus::Active {
            return Err(LicenseError::PlanNotFound {
                workspace_id: plan.workspace_id,
            });
        }
        for line in &lines {
            to_quantity(line.quantity)?;
        }

        let applied = self
            .store
            .apply_purchase(&PlanTopUp {
                plan_id: plan.id,
                workspace_id: plan.workspace_id,
                payment_ref: payment_ref.to_string(),
                added_caps: ResourceTotals::for_products(&self.allowances, &lines),
                products: lines,
                ends_at,
            })
            .await?;

        match applied {
            Some(updated) => {
                info!(
                    plan_id = %updated.id,
                    payment_ref,
                    max_members = updated.max_members,
                    "License plan topped up"
                );
                Ok(updated)
            }
            None => {
                info!(
                    plan_id = %plan.id,
                    payment_ref,
                    "Purchase already applied; skipping top-up"
                );
                Ok(self
                    .store
                    .find_plan(plan.id)
                    .await?
                    .unwrap_or_else(|| plan.clone()))
            }
        }
    }

    /// Lower a product's purchased quantity.
    ///
    /// Surplus free seats are retired. If more seats are in use than the new
    /// quantity, the product becomes EXCEEDED until revokes bring usage back.
    pub async fn reduce_quantity(
        &self,
        workspace_id: Uuid,
        product: Product,
        new_quantity: u32,
    ) -> Result<ProductStatus, LicenseError> {
        let pool = self.product_pool(workspace_id, product).await?;
        if pool.status.is_terminal() {
            return Err(LicenseError::ProductNotActive {
                product,
                status: pool.status,
            });
        }
        let quantity = to_quantity(new_quantity)?;
        if quantity > pool.quantity {
            return Err(AppError::validation(format!(
                "{product} quantity can only be reduced ({} -> {quantity})",
                pool.quantity
            ))
            .into());
        }

        self.store.set_product_quantity(pool.id, quantity).await?;
        let in_use = self.sync_seat_rows(pool.id, quantity).await?;
        let status = ProductStatus::for_usage(in_use, i64::from(quantity));
        if status != pool.status {
            self.store.set_product_status(pool.id, status).await?;
        }

        let plan = self.active_plan(workspace_id).await?;
        let removed = i64::from(pool.quantity - quantity);
        let caps = plan
            .caps()
            .saturating_sub(ResourceTotals::for_seats(&self.allowances, product, removed));
        let max_members = self.max_members(plan.id).await?;
        self.store
            .update_plan_caps(plan.id, &caps, max_members, plan.ends_at)
            .await?;

        if status == ProductStatus::Exceeded {
            warn!(
                workspace_id = %workspace_id,
                product = %product,
                in_use,
                quantity,
                "Quantity reduced below usage; product EXCEEDED"
            );
        } else {
            info!(
                workspace_id = %workspace_id,
                product = %product,
                quantity,
                "Quantity reduced"
            );
        }
        Ok(status)
    }

    /// Terminate the workspace's plan: every product INACTIVE, every seat
    /// released, the plan TERMINATE. Irreversible.
    pub async fn terminate_plan(&self, workspace_id: Uuid) -> Result<LicensePlan, LicenseError> {
        let plan = self.active_plan(workspace_id).await?;
        for pool in self.store.list_products(plan.id).await? {
            self.store
                .set_product_status(pool.id, ProductStatus::Inactive)
                .await?;
        }
        let released = self.store.release_plan_seats(plan.id).await?;
        self.store
            .set_plan_status(plan.id, PlanStatus::Terminate)
            .await?;

        info!(
            workspace_id = %workspace_id,
            plan_id = %plan.id,
            released,
            "License plan terminated"
        );
        Ok(LicensePlan {
            status: PlanStatus::Terminate,
            updated_at: Utc::now(),
            ..plan
        })
    }

    /// Keep live seat rows at `max(quantity, in_use)`. Returns `in_use`.
    async fn sync_seat_rows(&self, product_id: Uuid, quantity: i32) -> Result<i64, LicenseError> {
        let in_use = self.store.count_seats(product_id, SeatStatus::Use).await?;
        let free = self.store.count_seats(product_id, SeatStatus::Unuse).await?;
        let wanted = (i64::from(quantity) - in_use).max(0);
        if free < wanted {
            self.store.create_seats(product_id, wanted - free).await?;
        } else if free > wanted {
            self.store
                .retire_unused_seats(product_id, free - wanted)
                .await?;
        }
        Ok(in_use)
    }

    async fn max_members(&self, plan_id: Uuid) -> Result<i32, LicenseError> {
        Ok(self
            .store
            .list_products(plan_id)
            .await?
            .iter()
            .filter(|p| !p.status.is_terminal())
            .map(|p| p.quantity)
            .max()
            .unwrap_or(0))
    }
}

fn to_quantity(quantity: u32) -> Result<i32, LicenseError> {
    i32::try_from(quantity)
        .map_err(|_| AppError::validation(format!("Seat quantity {quantity} is too large")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use seatkeeper_database::MemoryWorkspaceStore;

    async fn setup(products: &[(Product, u32)]) -> (MemoryWorkspaceStore, LicensePoolManager, Uuid) {
        let store = MemoryWorkspaceStore::new();
        let manager = LicensePoolManager::new(Arc::new(store.clone()), ProductAllowances::default());
        let workspace_id = Uuid::new_v4();
        manager
            .open_plan(&PurchaseRequest {
                user_id: Uuid::new_v4(),
                workspace_id,
                products: products
                    .iter()
                    .map(|(p, q)| PurchasedProduct::new(*p, *q))
                    .collect(),
                payment_ref: format!("pay-{workspace_id}"),
                billing_customer_id: None,
                ends_at: Utc::now() + Duration::days(30),
            })
            .await
            .unwrap();
        (store, manager, workspace_id)
    }

    async fn pool_of(manager: &LicensePoolManager, ws: Uuid, product: Product) -> LicenseProduct {
        manager
            .list_products(ws)
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.product == product)
            .unwrap()
    }

    #[tokio::test]
    async fn test_grant_then_revoke_restores_usage() {
        let (store, manager, ws) = setup(&[(Product::Remote, 2)]).await;
        let user = Uuid::new_v4();

        let seat = manager.grant(ws, Product::Remote, user).await.unwrap();
        assert_eq!(seat.user_id, Some(user));
        assert_eq!(manager.usage(ws).await.unwrap().seats_in_use, 1);

        manager.revoke(ws, Product::Remote, user).await.unwrap();
        assert_eq!(manager.usage(ws).await.unwrap().seats_in_use, 0);

        let pool = pool_of(&manager, ws, Product::Remote).await;
        let row = store
            .seats_of(pool.id)
            .await
            .into_iter()
            .find(|s| s.id == seat.id)
            .unwrap();
        assert_eq!(row.status, SeatStatus::Unuse);
        assert_eq!(row.user_id, None);
    }

    #[tokio::test]
    async fn test_grant_failures() {
        let (_, manager, ws) = setup(&[(Product::Remote, 1)]).await;
        let user = Uuid::new_v4();

        assert!(matches!(
            manager.grant(ws, Product::Drive, user).await,
            Err(LicenseError::ProductNotFound { .. })
        ));
        manager.grant(ws, Product::Remote, user).await.unwrap();
        assert!(matches!(
            manager.grant(ws, Product::Remote, user).await,
            Err(LicenseError::AlreadyGranted { .. })
        ));
        assert!(matches!(
            manager.grant(ws, Product::Remote, Uuid::new_v4()).await,
            Err(LicenseError::NoSeatAvailable { .. })
        ));
        assert!(matches!(
            manager.revoke(ws, Product::Remote, Uuid::new_v4()).await,
            Err(LicenseError::SeatNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_grants_never_overbook() {
        let (_, manager, ws) = setup(&[(Product::Meeting, 3)]).await;
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.grant(ws, Product::Meeting, Uuid::new_v4()).await })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }
        assert_eq!(granted, 3);
        assert_eq!(manager.usage(ws).await.unwrap().seats_in_use, 3);
    }

    #[tokio::test]
    async fn test_top_up_is_idempotent_per_payment() {
        let (store, manager, ws) = setup(&[(Product::Remote, 1)]).await;
        let plan = manager.active_plan(ws).await.unwrap();
        let deltas = [
            PurchasedProduct::new(Product::Remote, 2),
            PurchasedProduct::new(Product::Drive, 4),
        ];

        let first = manager
            .top_up(&plan, "pay-2", &deltas, plan.ends_at)
            .await
            .unwrap();
        let again = manager
            .top_up(&plan, "pay-2", &deltas, plan.ends_at)
            .await
            .unwrap();

        assert_eq!(first.max_members, 4);
        assert_eq!(again.max_call_time_minutes, first.max_call_time_minutes);
        let remote = pool_of(&manager, ws, Product::Remote).await;
        assert_eq!(remote.quantity, 3);
        assert_eq!(store.seats_of(remote.id).await.len(), 3);
        let drive = pool_of(&manager, ws, Product::Drive).await;
        assert_eq!(drive.quantity, 4);
        assert_eq!(store.seats_of(drive.id).await.len(), 4);
    }

    #[tokio::test]
    async fn test_reduce_below_usage_exceeds_then_heals() {
        let (store, manager, ws) = setup(&[(Product::Drive, 3)]).await;
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        manager.grant(ws, Product::Drive, a).await.unwrap();
        manager.grant(ws, Product::Drive, b).await.unwrap();

        let status = manager.reduce_quantity(ws, Product::Drive, 1).await.unwrap();
        assert_eq!(status, ProductStatus::Exceeded);
        assert!(matches!(
            manager.grant(ws, Product::Drive, Uuid::new_v4()).await,
            Err(LicenseError::ProductNotActive { .. })
        ));

        manager.revoke(ws, Product::Drive, a).await.unwrap();
        let pool = pool_of(&manager, ws, Product::Drive).await;
        assert_eq!(pool.status, ProductStatus::Active);

        let seats = store.seats_of(pool.id).await;
        let live = seats.iter().filter(|s| s.status.is_live()).count();
        assert_eq!(live, 1);
        assert!(seats.iter().all(|s| s.user_id != Some(a)));
        assert!(seats.iter().all(Seat::is_consistent));
    }

    #[tokio::test]
    async fn test_racing_revokes_keep_a_free_seat() {
        let (store, manager, ws) = setup(&[(Product::Remote, 3)]).await;
        let users = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        for user in users {
            manager.grant(ws, Product::Remote, user).await.unwrap();
        }
        manager.reduce_quantity(ws, Product::Remote, 2).await.unwrap();

        // Another revoke read EXCEEDED and retired its seat without healing.
        let pool = pool_of(&manager, ws, Product::Remote).await;
        let raced = store.find_held_seat(pool.id, users[0]).await.unwrap().unwrap();
        assert!(store
            .transition_seat(raced.id, SeatStatus::Use, SeatStatus::Terminate, None)
            .await
            .unwrap());
        assert_eq!(store.count_seats(pool.id, SeatStatus::Unuse).await.unwrap(), 0);

        manager.revoke(ws, Product::Remote, users[1]).await.unwrap();
        let pool = pool_of(&manager, ws, Product::Remote).await;
        assert_eq!(pool.status, ProductStatus::Active);
        assert_eq!(store.count_seats(pool.id, SeatStatus::Use).await.unwrap(), 1);
        assert_eq!(store.count_seats(pool.id, SeatStatus::Unuse).await.unwrap(), 1);
        manager.grant(ws, Product::Remote, Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_terminate_plan_releases_everything() {
        let (_, manager, ws) = setup(&[(Product::Remote, 2), (Product::Meeting, 1)]).await;
        let user = Uuid::new_v4();
        manager.grant(ws, Product::Remote, user).await.unwrap();

        let plan = manager.terminate_plan(ws).await.unwrap();
        assert_eq!(plan.status, PlanStatus::Terminate);
        assert!(matches!(
            manager.active_plan(ws).await,
            Err(LicenseError::PlanNotFound { .. })
        ));
        assert!(manager.held_products(ws, user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recalculate_usage_sums_allowances() {
        let (_, manager, ws) = setup(&[(Product::Remote, 2), (Product::Drive, 2)]).await;
        manager.grant(ws, Product::Drive, Uuid::new_v4()).await.unwrap();
        let plan = manager.active_plan(ws).await.unwrap();

        let allocated = manager.recalculate_usage(plan.id).await.unwrap();
        assert_eq!(
            allocated,
            ResourceTotals::for_seats(manager.allowances(), Product::Drive, 1)
        );
    }
}
