//! License plan, product pool and seat repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use seatkeeper_core::error::{AppError, ErrorKind};
use seatkeeper_core::result::AppResult;
use seatkeeper_entity::license::{
    LicensePlan, LicenseProduct, NewLicensePlan, PlanStatus, PlanTopUp, Product, ProductStatus,
    ResourceTotals, Seat, SeatStatus,
};

use super::map_write_error;
use crate::store::LicenseStore;

/// PostgreSQL-backed seat pool.
#[derive(Debug, Clone)]
pub struct LicenseRepository {
    pool: PgPool,
}

impl LicenseRepository {
    /// Create a new license repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LicenseStore for LicenseRepository {
    async fn find_active_plan(&self, workspace_id: Uuid) -> AppResult<Option<LicensePlan>> {
        sqlx::query_as::<_, LicensePlan>(
            "SELECT * FROM license_plans WHERE workspace_id = $1 AND status = $2",
        )
        .bind(workspace_id)
        .bind(PlanStatus::Active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find active plan", e))
    }

    async fn find_plan(&self, plan_id: Uuid) -> AppResult<Option<LicensePlan>> {
        sqlx::query_as::<_, LicensePlan>("SELECT * FROM license_plans WHERE id = $1")
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find plan", e))
    }

    async fn create_plan(&self, plan: &NewLicensePlan, max_members: i32) -> AppResult<LicensePlan> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let created = sqlx::query_as::<_, LicensePlan>(
            "INSERT INTO license_plans (id, owner_id, workspace_id, starts_at, ends_at, \
             max_members, max_call_time_minutes, max_storage_gb, max_download_hits, \
             payment_ref, billing_customer_id, status) \
             VALUES ($1, $2, $3, NOW(), $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(plan.owner_id)
        .bind(plan.workspace_id)
        .bind(plan.ends_at)
        .bind(max_members)
        .bind(plan.caps.call_time_minutes)
        .bind(plan.caps.storage_gb)
        .bind(plan.caps.download_hits)
        .bind(&plan.payment_ref)
        .bind(&plan.billing_customer_id)
        .bind(PlanStatus::Active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error("Failed to create license plan", e))?;

        for purchased in &plan.products {
            let product_id: Uuid = sqlx::query_scalar(
                "INSERT INTO license_products (id, plan_id, workspace_id, product, quantity, status) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(created.id)
            .bind(created.workspace_id)
            .bind(purchased.product)
            .bind(purchased.quantity as i32)
            .bind(ProductStatus::Active)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_write_error("Failed to create product pool", e))?;

            sqlx::query(
                "INSERT INTO license_seats (product_id, status) \
                 SELECT $1, $2 FROM generate_series(1, $3)",
            )
            .bind(product_id)
            .bind(SeatStatus::Unuse)
            .bind(purchased.quantity as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create seats", e))?;
        }

        sqlx::query("INSERT INTO license_purchases (payment_ref, plan_id) VALUES ($1, $2)")
            .bind(&plan.payment_ref)
            .bind(created.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error("Failed to record purchase", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit license plan", e)
        })?;

        Ok(created)
    }

    async fn apply_purchase(&self, top_up: &PlanTopUp) -> AppResult<Option<LicensePlan>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let recorded = sqlx::query(
            "INSERT INTO license_purchases (payment_ref, plan_id) VALUES ($1, $2) \
             ON CONFLICT (payment_ref) DO NOTHING",
        )
        .bind(&top_up.payment_ref)
        .bind(top_up.plan_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record purchase", e))?;
        if recorded.rows_affected() == 0 {
            return Ok(None);
        }

        let status: Option<PlanStatus> =
            sqlx::query_scalar("SELECT status FROM license_plans WHERE id = $1 FOR UPDATE")
                .bind(top_up.plan_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock plan", e))?;
        if status != Some(PlanStatus::Active) {
            return Err(AppError::not_found(format!(
                "Active license plan {} not found",
                top_up.plan_id
            )));
        }

        for line in &top_up.products {
            let added = i32::try_from(line.quantity).map_err(|_| {
                AppError::validation(format!("Seat quantity {} is too large", line.quantity))
            })?;
            let existing = sqlx::query_as::<_, LicenseProduct>(
                "SELECT * FROM license_products WHERE plan_id = $1 AND product = $2 FOR UPDATE",
            )
            .bind(top_up.plan_id)
            .bind(line.product)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock product", e))?;

            let pool = match existing {
                Some(pool) => pool,
                None => sqlx::query_as::<_, LicenseProduct>(
                    "INSERT INTO license_products \
                     (id, plan_id, workspace_id, product, quantity, status) \
                     VALUES ($1, $2, $3, $4, 0, $5) RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(top_up.plan_id)
                .bind(top_up.workspace_id)
                .bind(line.product)
                .bind(ProductStatus::Active)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_write_error("Failed to create product pool", e))?,
            };
            let quantity = pool.quantity.checked_add(added).ok_or_else(|| {
                AppError::validation(format!("{} quantity overflows", line.product))
            })?;

            let (in_use, free): (i64, i64) = sqlx::query_as(
                "SELECT COUNT(*) FILTER (WHERE status = $2), COUNT(*) FILTER (WHERE status = $3) \
                 FROM license_seats WHERE product_id = $1",
            )
            .bind(pool.id)
            .bind(SeatStatus::Use)
            .bind(SeatStatus::Unuse)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count seats", e))?;

            let missing = (i64::from(quantity) - in_use).max(0) - free;
            if missing > 0 {
                sqlx::query(
                    "INSERT INTO license_seats (product_id, status) \
                     SELECT $1, $2 FROM generate_series(1, $3)",
                )
                .bind(pool.id)
                .bind(SeatStatus::Unuse)
                .bind(missing)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to create seats", e)
                })?;
            }

            let status = if pool.status == ProductStatus::Exceeded && in_use <= i64::from(quantity)
            {
                ProductStatus::Active
            } else {
                pool.status
            };
            sqlx::query(
                "UPDATE license_products SET quantity = $2, status = $3, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(pool.id)
            .bind(quantity)
            .bind(status)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update product pool", e)
            })?;
        }

        let updated = sqlx::query_as::<_, LicensePlan>(
            "UPDATE license_plans SET \
               max_call_time_minutes = max_call_time_minutes + $2, \
               max_storage_gb = max_storage_gb + $3, \
               max_download_hits = max_download_hits + $4, \
               max_members = (SELECT COALESCE(MAX(quantity), 0) FROM license_products \
                              WHERE plan_id = $1 AND status <> $5), \
               ends_at = GREATEST(ends_at, $6), updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(top_up.plan_id)
        .bind(top_up.added_caps.call_time_minutes)
        .bind(top_up.added_caps.storage_gb)
        .bind(top_up.added_caps.download_hits)
        .bind(ProductStatus::Inactive)
        .bind(top_up.ends_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update plan caps", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit purchase", e)
        })?;

        Ok(Some(updated))
    }

    async fn update_plan_caps(
        &self,
        plan_id: Uuid,
        caps: &ResourceTotals,
        max_members: i32,
        ends_at: DateTime<Utc>,
    ) -> AppResult<LicensePlan> {
        sqlx::query_as::<_, LicensePlan>(
            "UPDATE license_plans SET max_call_time_minutes = $2, max_storage_gb = $3, \
             max_download_hits = $4, max_members = $5, ends_at = $6, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(plan_id)
        .bind(caps.call_time_minutes)
        .bind(caps.storage_gb)
        .bind(caps.download_hits)
        .bind(max_members)
        .bind(ends_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update plan caps", e))?
        .ok_or_else(|| AppError::not_found(format!("License plan {plan_id} not found")))
    }

    async fn set_plan_status(&self, plan_id: Uuid, status: PlanStatus) -> AppResult<()> {
        sqlx::query("UPDATE license_plans SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(plan_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update plan status", e)
            })?;
        Ok(())
    }

    async fn list_products(&self, plan_id: Uuid) -> AppResult<Vec<LicenseProduct>> {
        sqlx::query_as::<_, LicenseProduct>(
            "SELECT * FROM license_products WHERE plan_id = $1 ORDER BY product",
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list products", e))
    }

    async fn find_product(
        &self,
        plan_id: Uuid,
        product: Product,
    ) -> AppResult<Option<LicenseProduct>> {
        sqlx::query_as::<_, LicenseProduct>(
            "SELECT * FROM license_products WHERE plan_id = $1 AND product = $2",
        )
        .bind(plan_id)
        .bind(product)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find product", e))
    }

    async fn set_product_quantity(&self, product_id: Uuid, quantity: i32) -> AppResult<()> {
        sqlx::query("UPDATE license_products SET quantity = $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .bind(quantity)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update product quantity", e)
            })?;
        Ok(())
    }

    async fn set_product_status(&self, product_id: Uuid, status: ProductStatus) -> AppResult<()> {
        sqlx::query("UPDATE license_products SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update product status", e)
            })?;
        Ok(())
    }

    async fn count_seats(&self, product_id: Uuid, status: SeatStatus) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM license_seats WHERE product_id = $1 AND status = $2",
        )
        .bind(product_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count seats", e))
    }

    async fn create_seats(&self, product_id: Uuid, count: i64) -> AppResult<u64> {
        if count <= 0 {
            return Ok(0);
        }
        let result = sqlx::query(
            "INSERT INTO license_seats (product_id, status) \
             SELECT $1, $2 FROM generate_series(1, $3)",
        )
        .bind(product_id)
        .bind(SeatStatus::Unuse)
        .bind(count)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create seats", e))?;
        Ok(result.rows_affected())
    }

    async fn retire_unused_seats(&self, product_id: Uuid, count: i64) -> AppResult<u64> {
        if count <= 0 {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE license_seats SET status = $3, updated_at = NOW() WHERE id IN ( \
               SELECT id FROM license_seats WHERE product_id = $1 AND status = $2 \
               ORDER BY id DESC LIMIT $4 FOR UPDATE SKIP LOCKED)",
        )
        .bind(product_id)
        .bind(SeatStatus::Unuse)
        .bind(SeatStatus::Terminate)
        .bind(count)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to retire seats", e))?;
        Ok(result.rows_affected())
    }

    async fn first_unused_seat(&self, product_id: Uuid) -> AppResult<Option<Seat>> {
        sqlx::query_as::<_, Seat>(
            "SELECT * FROM license_seats WHERE product_id = $1 AND status = $2 \
             ORDER BY id LIMIT 1",
        )
        .bind(product_id)
        .bind(SeatStatus::Unuse)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find free seat", e))
    }

    async fn find_held_seat(&self, product_id: Uuid, user_id: Uuid) -> AppResult<Option<Seat>> {
        sqlx::query_as::<_, Seat>(
            "SELECT * FROM license_seats WHERE product_id = $1 AND user_id = $2 AND status = $3",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(SeatStatus::Use)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find held seat", e))
    }

    async fn transition_seat(
        &self,
        seat_id: i64,
        from: SeatStatus,
        to: SeatStatus,
        holder: Option<Uuid>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE license_seats SET status = $3, user_id = $4, updated_at = NOW() \
             WHERE id = $1 AND status = $2",
        )
        .bind(seat_id)
        .bind(from)
        .bind(to)
        .bind(holder)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to transition seat", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_plan_seats(&self, plan_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE license_seats s SET status = $2, user_id = NULL, updated_at = NOW() \
             FROM license_products p \
             WHERE s.product_id = p.id AND p.plan_id = $1 AND s.status = $3",
        )
        .bind(plan_id)
        .bind(SeatStatus::Unuse)
        .bind(SeatStatus::Use)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to release seats", e))?;
        Ok(result.rows_affected())
    }

    async fn held_products(&self, workspace_id: Uuid, user_id: Uuid) -> AppResult<Vec<Product>> {
        sqlx::query_scalar::<_, Product>(
            "SELECT p.product FROM license_seats s \
             JOIN license_products p ON p.id = s.product_id \
             JOIN license_plans pl ON pl.id = p.plan_id \
             WHERE pl.workspace_id = $1 AND pl.status = $2 \
               AND s.user_id = $3 AND s.status = $4 \
             ORDER BY p.product",
        )
        .bind(workspace_id)
        .bind(PlanStatus::Active)
        .bind(user_id)
        .bind(SeatStatus::Use)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list held products", e))
    }
}
