//! Allocation authorization: issue a capacity check, consume it once.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use seatkeeper_cache::CacheManager;
use seatkeeper_cache::keys;
use seatkeeper_core::config::{LicenseConfig, ResourceCeilings};
use seatkeeper_core::error::AppError;
use seatkeeper_core::traits::cache::CacheProvider;
use seatkeeper_entity::authorization::AllocationAuthorization;
use seatkeeper_entity::license::{LicensePlan, PurchasedProduct, ResourceTotals};

use crate::code::{self, CodeGenerator};
use crate::error::LicenseError;
use crate::pool::purchase::merge_lines;
use crate::pool::{LicensePoolManager, PurchaseRequest};

/// Attempts at finding an unused authorization code.
const CODE_ATTEMPTS: usize = 3;

/// What a consumed authorization did to the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "plan", rename_all = "snake_case")]
pub enum AllocationOutcome {
    /// The workspace had no plan; one was opened.
    Opened(LicensePlan),
    /// The workspace's plan was topped up.
    ToppedUp(LicensePlan),
}

impl AllocationOutcome {
    /// The resulting plan.
    pub fn plan(&self) -> &LicensePlan {
        match self {
            Self::Opened(plan) | Self::ToppedUp(plan) => plan,
        }
    }
}

/// Issues and consumes allocation authorizations.
#[derive(Debug, Clone)]
pub struct AllocationAuthorizationCache {
    cache: CacheManager,
    pool: LicensePoolManager,
    ttl: Duration,
    ceilings: ResourceCeilings,
    codes: CodeGenerator,
}

impl AllocationAuthorizationCache {
    /// Creates a new authorization cache.
    pub fn new(cache: CacheManager, pool: LicensePoolManager, config: &LicenseConfig) -> Self {
        Self {
            cache,
            pool,
            ttl: Duration::from_secs(config.authorization_ttl_seconds),
            ceilings: config.ceilings,
            codes: CodeGenerator::new(config.session_code_length),
        }
    }

    /// Lifetime of an authorization.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Existing plan caps plus the requested seats' allowances.
    async fn expected_totals(
        &self,
        workspace_id: Uuid,
        lines: &[PurchasedProduct],
    ) -> Result<ResourceTotals, LicenseError> {
        let existing = self
            .pool
            .current_plan(workspace_id)
            .await?
            .map(|plan| plan.caps())
            .unwrap_or_default();
        Ok(existing + ResourceTotals::for_products(self.pool.allowances(), lines))
    }

    /// Check a purchase against the global ceilings and, if it fits, store
    /// an authorization for the allocation that follows payment.
    pub async fn issue_check(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        products: &[PurchasedProduct],
    ) -> Result<AllocationAuthorization, LicenseError> {
        let lines = merge_lines(products);
        if lines.is_empty() {
            return Err(LicenseError::NoLicenseSelected);
        }

        let expected = self.expected_totals(workspace_id, &lines).await?;
        if let Some(resource) = expected.exceeded_ceiling(&self.ceilings) {
            info!(
                workspace_id = %workspace_id,
                user_id = %user_id,
                resource,
                "Allocation check denied"
            );
            return Err(LicenseError::CapacityDenied { resource });
        }

        for _ in 0..CODE_ATTEMPTS {
            let now = Utc::now();
            let authorization = AllocationAuthorization {
                code: self.codes.generate(),
                user_id,
                workspace_id,
                expected,
                issued_at: now,
                expires_at: code::expires_at(now, self.ttl),
            };
            let json = serde_json::to_string(&authorization).map_err(AppError::from)?;
            let key = keys::allocation_authorization(&authorization.code);
            if self.cache.set_nx(&key, &json, self.ttl).await? {
                info!(
                    workspace_id = %workspace_id,
                    user_id = %user_id,
                    "Allocation authorization issued"
                );
                return Ok(authorization);
            }
        }

        Err(AppError::internal("Could not allocate a unique authorization code").into())
    }

    /// Consume an authorization and apply the purchase to the pool.
    ///
    /// The token is taken atomically, so it authorizes at most one
    /// allocation. A request whose user or recomputed totals differ from
    /// the stored ones fails with [`LicenseError::AuthorizationInvalid`]
    /// and the token is burned. If the pool write fails for an
    /// infrastructure reason the token is put back with its remaining TTL.
    pub async fn consume(
        &self,
        code: &str,
        request: &PurchaseRequest,
    ) -> Result<AllocationOutcome, LicenseError> {
        let key = keys::allocation_authorization(code);
        let remaining = self.cache.ttl(&key).await?;
        let Some(authorization): Option<AllocationAuthorization> =
            self.cache.take_json(&key).await?
        else {
            return Err(LicenseError::AuthorizationInvalid);
        };

        let totals = self
            .expected_totals(request.workspace_id, &request.lines())
            .await?;
        if !authorization.matches(request.user_id, request.workspace_id, &totals) {
            warn!(
                workspace_id = %request.workspace_id,
                user_id = %request.user_id,
                "Allocation request does not match its authorization"
            );
            return Err(LicenseError::AuthorizationInvalid);
        }

        let applied = match self.pool.current_plan(request.workspace_id).await? {
            None => self.pool.open_plan(request).await.map(AllocationOutcome::Opened),
            Some(plan) => self
                .pool
                .top_up(&plan, &request.payment_ref, &request.products, request.ends_at)
                .await
                .map(AllocationOutcome::ToppedUp),
        };

        match applied {
            Ok(outcome) => {
                info!(
                    workspace_id = %request.workspace_id,
                    plan_id = %outcome.plan().id,
                    payment_ref = %request.payment_ref,
                    "Allocation applied"
                );
                Ok(outcome)
            }
            Err(e) => {
                if e.is_infrastructure() {
                    self.restore(&key, &authorization, remaining).await;
                }
                Err(e)
            }
        }
    }

    async fn restore(
        &self,
        key: &str,
        authorization: &AllocationAuthorization,
        remaining: Option<Duration>,
    ) {
        let Some(ttl) = remaining.filter(|ttl| !ttl.is_zero()) else {
            return;
        };
        match self.cache.set_json(key, authorization, ttl).await {
            Ok(()) => info!(
                workspace_id = %authorization.workspace_id,
                "Allocation authorization restored for retry"
            ),
            Err(e) => warn!(
                workspace_id = %authorization.workspace_id,
                error = %e,
                "Failed to restore allocation authorization"
            ),
        }
    }
}
