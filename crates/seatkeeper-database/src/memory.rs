//! In-memory seat pool and membership store for single-process deployments.
//!
//! Mirrors the constraints the PostgreSQL schema enforces: one ACTIVE plan
//! per workspace, unique payment references, one USE seat per user and
//! product pool, and one membership per user and workspace.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use seatkeeper_core::error::AppError;
use seatkeeper_core::result::AppResult;
use seatkeeper_entity::license::{
    LicensePlan, LicenseProduct, NewLicensePlan, PlanStatus, PlanTopUp, Product, ProductStatus,
    ResourceTotals, Seat, SeatStatus,
};
use seatkeeper_entity::workspace::{MemberFilter, Membership, WorkspaceRole};

use crate::store::{LicenseStore, MembershipStore};

#[derive(Debug, Default)]
struct InnerState {
    plans: HashMap<Uuid, LicensePlan>,
    products: HashMap<Uuid, LicenseProduct>,
    seats: BTreeMap<i64, Seat>,
    last_seat_id: i64,
    purchases: HashMap<String, Uuid>,
    members: Vec<Membership>,
}

impl InnerState {
    fn active_plan(&self, workspace_id: Uuid) -> Option<&LicensePlan> {
        self.plans
            .values()
            .find(|p| p.workspace_id == workspace_id && p.status == PlanStatus::Active)
    }

    fn append_seats(&mut self, product_id: Uuid, count: i64) -> u64 {
        let now = Utc::now();
        let mut created = 0;
        for _ in 0..count.max(0) {
            self.last_seat_id += 1;
            let id = self.last_seat_id;
            self.seats.insert(
                id,
                Seat {
                    id,
                    product_id,
                    status: SeatStatus::Unuse,
                    user_id: None,
                    created_at: now,
                    updated_at: now,
                },
            );
            created += 1;
        }
        created
    }

    fn count_seats(&self, product_id: Uuid, status: SeatStatus) -> i64 {
        self.seats
            .values()
            .filter(|s| s.product_id == product_id && s.status == status)
            .count() as i64
    }

    fn held_products(&self, workspace_id: Uuid, user_id: Uuid) -> Vec<Product> {
        let Some(plan) = self.active_plan(workspace_id) else {
            return Vec::new();
        };
        let mut held: Vec<Product> = self
            .seats
            .values()
            .filter(|s| s.status == SeatStatus::Use && s.user_id == Some(user_id))
            .filter_map(|s| self.products.get(&s.product_id))
            .filter(|p| p.plan_id == plan.id)
            .map(|p| p.product)
            .collect();
        held.sort();
        held.dedup();
        held
    }

    fn matching_members(&self, workspace_id: Uuid, filter: MemberFilter) -> Vec<Membership> {
        let mut members: Vec<Membership> = self
            .members
            .iter()
            .filter(|m| m.workspace_id == workspace_id)
            .filter(|m| {
                filter.matches(m, |product| {
                    self.held_products(workspace_id, m.user_id).contains(&product)
                })
            })
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        members
    }
}

/// Single-process store implementing both [`LicenseStore`] and
/// [`MembershipStore`] behind one Tokio mutex.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkspaceStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryWorkspaceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every seat row of a product pool, in creation order.
    pub async fn seats_of(&self, product_id: Uuid) -> Vec<Seat> {
        let state = self.state.lock().await;
        state
            .seats
            .values()
            .filter(|s| s.product_id == product_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LicenseStore for MemoryWorkspaceStore {
    async fn find_active_plan(&self, workspace_id: Uuid) -> AppResult<Option<LicensePlan>> {
        let state = self.state.lock().await;
        Ok(state.active_plan(workspace_id).cloned())
    }

    async fn find_plan(&self, plan_id: Uuid) -> AppResult<Option<LicensePlan>> {
        let state = self.state.lock().await;
        Ok(state.plans.get(&plan_id).cloned())
    }

    async fn create_plan(&self, plan: &NewLicensePlan, max_members: i32) -> AppResult<LicensePlan> {
        let mut state = self.state.lock().await;

        if state.active_plan(plan.workspace_id).is_some() {
            return Err(AppError::conflict(format!(
                "Workspace {} already has an active plan",
                plan.workspace_id
            )));
        }
        if state.purchases.contains_key(&plan.payment_ref) {
            return Err(AppError::conflict(format!(
                "Payment {} was already applied",
                plan.payment_ref
            )));
        }

        let now = Utc::now();
        let created = LicensePlan {
            id: Uuid::new_v4(),
            owner_id: plan.owner_id,
            workspace_id: plan.workspace_id,
            starts_at: now,
            ends_at: plan.ends_at,
            max_members,
            max_call_time_minutes: plan.caps.call_time_minutes,
            max_storage_gb: plan.caps.storage_gb,
            max_download_hits: plan.caps.download_hits,
            payment_ref: plan.payment_ref.clone(),
            billing_customer_id: plan.billing_customer_id.clone(),
            status: PlanStatus::Active,
            created_at: now,
            updated_at: now,
        };

        for purchased in &plan.products {
            let product = LicenseProduct {
                id: Uuid::new_v4(),
                plan_id: created.id,
                workspace_id: created.workspace_id,
                product: purchased.product,
                quantity: purchased.quantity as i32,
                status: ProductStatus::Active,
                created_at: now,
                updated_at: now,
            };
            state.append_seats(product.id, i64::from(purchased.quantity));
            state.products.insert(product.id, product);
        }

        state.purchases.insert(plan.payment_ref.clone(), created.id);
        state.plans.insert(created.id, created.clone());
        Ok(created)
    }

    async fn apply_purchase(&self, top_up: &PlanTopUp) -> AppResult<Option<LicensePlan>> {
        let mut state = self.state.lock().await;
        if state.purchases.contains_key(&top_up.payment_ref) {
            return Ok(None);
        }
        if !state
            .plans
            .get(&top_up.plan_id)
            .is_some_and(|p| p.status == PlanStatus::Active)
        {
            return Err(AppError::not_found(format!(
                "Active license plan {} not found",
                top_up.plan_id
            )));
        }

        // Resolve every line before mutating so a bad line changes nothing.
        let mut lines = Vec::with_capacity(top_up.products.len());
        for line in &top_up.products {
            let existing = state
                .products
                .values()
                .find(|p| p.plan_id == top_up.plan_id && p.product == line.product);
            let quantity = i32::try_from(line.quantity)
                .ok()
                .and_then(|added| existing.map_or(Some(added), |p| p.quantity.checked_add(added)))
                .ok_or_else(|| {
                    AppError::validation(format!("{} quantity overflows", line.product))
                })?;
            lines.push((line.product, existing.map(|p| p.id), quantity));
        }

        let now = Utc::now();
        for (product, existing, quantity) in lines {
            let product_id = existing.unwrap_or_else(Uuid::new_v4);
            let in_use = state.count_seats(product_id, SeatStatus::Use);
            let free = state.count_seats(product_id, SeatStatus::Unuse);
            state.append_seats(product_id, (i64::from(quantity) - in_use).max(0) - free);

            let pool = state
                .products
                .entry(product_id)
                .or_insert_with(|| LicenseProduct {
                    id: product_id,
                    plan_id: top_up.plan_id,
                    workspace_id: top_up.workspace_id,
                    product,
                    quantity: 0,
                    status: ProductStatus::Active,
                    created_at: now,
                    updated_at: now,
                });
            pool.quantity = quantity;
            if pool.status == ProductStatus::Exceeded && in_use <= i64::from(quantity) {
                pool.status = ProductStatus::Active;
            }
            pool.updated_at = now;
        }

        let max_members = state
            .products
            .values()
            .filter(|p| p.plan_id == top_up.plan_id && !p.status.is_terminal())
            .map(|p| p.quantity)
            .max()
            .unwrap_or(0);
        state
            .purchases
            .insert(top_up.payment_ref.clone(), top_up.plan_id);

        let Some(plan) = state.plans.get_mut(&top_up.plan_id) else {
            return Err(AppError::not_found(format!(
                "License plan {} not found",
                top_up.plan_id
            )));
        };
        let caps = plan.caps() + top_up.added_caps;
        plan.max_call_time_minutes = caps.call_time_minutes;
        plan.max_storage_gb = caps.storage_gb;
        plan.max_download_hits = caps.download_hits;
        plan.max_members = max_members;
        plan.ends_at = plan.ends_at.max(top_up.ends_at);
        plan.updated_at = now;
        Ok(Some(plan.clone()))
    }

    async fn update_plan_caps(
        &self,
        plan_id: Uuid,
        caps: &ResourceTotals,
        max_members: i32,
        ends_at: DateTime<Utc>,
    ) -> AppResult<LicensePlan> {
        let mut state = self.state.lock().await;
        let plan = state
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| AppError::not_found(format!("License plan {plan_id} not found")))?;
        plan.max_call_time_minutes = caps.call_time_minutes;
        plan.max_storage_gb = caps.storage_gb;
        plan.max_download_hits = caps.download_hits;
        plan.max_members = max_members;
        plan.ends_at = ends_at;
        plan.updated_at = Utc::now();
        Ok(plan.clone())
    }

    async fn set_plan_status(&self, plan_id: Uuid, status: PlanStatus) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(plan) = state.plans.get_mut(&plan_id) {
            plan.status = status;
            plan.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_products(&self, plan_id: Uuid) -> AppResult<Vec<LicenseProduct>> {
        let state = self.state.lock().await;
        let mut products: Vec<LicenseProduct> = state
            .products
            .values()
            .filter(|p| p.plan_id == plan_id)
            .cloned()
            .collect();
        products.sort_by_key(|p| p.product);
        Ok(products)
    }

    async fn find_product(
        &self,
        plan_id: Uuid,
        product: Product,
    ) -> AppResult<Option<LicenseProduct>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .values()
            .find(|p| p.plan_id == plan_id && p.product == product)
            .cloned())
    }

    async fn set_product_quantity(&self, product_id: Uuid, quantity: i32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(product) = state.products.get_mut(&product_id) {
            product.quantity = quantity;
            product.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_product_status(&self, product_id: Uuid, status: ProductStatus) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(product) = state.products.get_mut(&product_id) {
            product.status = status;
            product.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn count_seats(&self, product_id: Uuid, status: SeatStatus) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.count_seats(product_id, status))
    }

    async fn create_seats(&self, product_id: Uuid, count: i64) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        Ok(state.append_seats(product_id, count))
    }

    async fn retire_unused_seats(&self, product_id: Uuid, count: i64) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut retired = 0;
        for seat in state.seats.values_mut().rev() {
            if retired >= count.max(0) as u64 {
                break;
            }
            if seat.product_id == product_id && seat.status == SeatStatus::Unuse {
                seat.status = SeatStatus::Terminate;
                seat.updated_at = now;
                retired += 1;
            }
        }
        Ok(retired)
    }

    async fn first_unused_seat(&self, product_id: Uuid) -> AppResult<Option<Seat>> {
        let state = self.state.lock().await;
        Ok(state
            .seats
            .values()
            .find(|s| s.product_id == product_id && s.status == SeatStatus::Unuse)
            .cloned())
    }

    async fn find_held_seat(&self, product_id: Uuid, user_id: Uuid) -> AppResult<Option<Seat>> {
        let state = self.state.lock().await;
        Ok(state
            .seats
            .values()
            .find(|s| {
                s.product_id == product_id
                    && s.status == SeatStatus::Use
                    && s.user_id == Some(user_id)
            })
            .cloned())
    }

    async fn transition_seat(
        &self,
        seat_id: i64,
        from: SeatStatus,
        to: SeatStatus,
        holder: Option<Uuid>,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;

        let Some(product_id) = state
            .seats
            .get(&seat_id)
            .filter(|s| s.status == from)
            .map(|s| s.product_id)
        else {
            return Ok(false);
        };

        if to == SeatStatus::Use {
            let duplicate = state.seats.values().any(|s| {
                s.id != seat_id
                    && s.product_id == product_id
                    && s.status == SeatStatus::Use
                    && s.user_id.is_some()
                    && s.user_id == holder
            });
            if duplicate {
                return Err(AppError::conflict(format!(
                    "User already holds a seat of pool {product_id}"
                )));
            }
        }

        if let Some(seat) = state.seats.get_mut(&seat_id) {
            seat.status = to;
            seat.user_id = holder;
            seat.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn release_plan_seats(&self, plan_id: Uuid) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let InnerState {
            products, seats, ..
        } = &mut *state;
        let now = Utc::now();
        let mut released = 0;
        for seat in seats.values_mut() {
            let in_plan = products
                .get(&seat.product_id)
                .is_some_and(|p| p.plan_id == plan_id);
            if in_plan && seat.status == SeatStatus::Use {
                seat.status = SeatStatus::Unuse;
                seat.user_id = None;
                seat.updated_at = now;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn held_products(&self, workspace_id: Uuid, user_id: Uuid) -> AppResult<Vec<Product>> {
        let state = self.state.lock().await;
        Ok(state.held_products(workspace_id, user_id))
    }
}

#[async_trait]
impl MembershipStore for MemoryWorkspaceStore {
    async fn find_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Membership>> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .iter()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_members(
        &self,
        workspace_id: Uuid,
        filter: MemberFilter,
    ) -> AppResult<Vec<Membership>> {
        let state = self.state.lock().await;
        Ok(state.matching_members(workspace_id, filter))
    }

    async fn count_members(&self, workspace_id: Uuid, filter: MemberFilter) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.matching_members(workspace_id, filter).len() as i64)
    }

    async fn create_member(&self, member: &Membership) -> AppResult<Membership> {
        let mut state = self.state.lock().await;
        if state
            .members
            .iter()
            .any(|m| m.workspace_id == member.workspace_id && m.user_id == member.user_id)
        {
            return Err(AppError::conflict(format!(
                "User {} is already a member of workspace {}",
                member.user_id, member.workspace_id
            )));
        }
        state.members.push(member.clone());
        Ok(member.clone())
    }

    async fn update_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state
            .members
            .iter_mut()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
        {
            Some(member) => {
                member.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_member(&self, workspace_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.members.len();
        state
            .members
            .retain(|m| !(m.workspace_id == workspace_id && m.user_id == user_id));
        Ok(state.members.len() < before)
    }

    async fn delete_workspace_members(&self, workspace_id: Uuid) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.members.len();
        state.members.retain(|m| m.workspace_id != workspace_id);
        Ok((before - state.members.len()) as u64)
    }

    async fn owned_workspaces(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .iter()
            .filter(|m| m.user_id == user_id && m.role == WorkspaceRole::Owner)
            .map(|m| m.workspace_id)
            .collect())
    }
}
