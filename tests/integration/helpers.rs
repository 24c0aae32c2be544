//! Shared test helpers for integration tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use seatkeeper_cache::CacheManager;
use seatkeeper_cache::memory::MemoryCacheProvider;
use seatkeeper_client::Collaborators;
use seatkeeper_client::mock::{MockBillingService, MockIdentityService, MockNotifier};
use seatkeeper_core::config::LicenseConfig;
use seatkeeper_core::config::cache::MemoryCacheConfig;
use seatkeeper_database::MemoryWorkspaceStore;
use seatkeeper_database::store::MembershipStore;
use seatkeeper_entity::account::Account;
use seatkeeper_entity::license::{Product, PurchasedProduct};
use seatkeeper_entity::workspace::{MemberType, Membership, WorkspaceRole};
use seatkeeper_service::{PurchaseRequest, RequestContext, ServiceRegistry};

/// Test application context
pub struct TestApp {
    /// Wired services
    pub services: ServiceRegistry,
    /// Backing store, for direct seat-row inspection
    pub store: MemoryWorkspaceStore,
    /// Identity fake
    pub identity: MockIdentityService,
    /// Billing fake
    pub billing: MockBillingService,
    /// Notification fake
    pub notifier: MockNotifier,
    /// Workspace under test
    pub workspace_id: Uuid,
    /// Workspace owner
    pub owner: Account,
}

impl TestApp {
    /// A workspace with an owner and no plan.
    pub async fn new() -> Self {
        let store = MemoryWorkspaceStore::new();
        let cache = CacheManager::in_memory(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        let identity = MockIdentityService::new();
        let billing = MockBillingService::new();
        let notifier = MockNotifier::new();
        let collaborators = Collaborators {
            identity: Arc::new(identity.clone()),
            billing: Arc::new(billing.clone()),
            notifier: Arc::new(notifier.clone()),
        };
        let services = ServiceRegistry::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            cache,
            collaborators,
            &LicenseConfig::default(),
        );

        let workspace_id = Uuid::new_v4();
        let owner = identity.add_account("owner@example.com", "Owner");
        store
            .create_member(&Membership::new(
                workspace_id,
                owner.id,
                WorkspaceRole::Owner,
                MemberType::Invited,
            ))
            .await
            .expect("Failed to create owner membership");

        Self {
            services,
            store,
            identity,
            billing,
            notifier,
            workspace_id,
            owner,
        }
    }

    /// A workspace whose active plan holds the given product quantities.
    pub async fn with_plan(products: &[(Product, u32)]) -> Self {
        let app = Self::new().await;
        app.services
            .pool
            .open_plan(&app.purchase(products))
            .await
            .expect("Failed to open plan");
        app
    }

    /// A purchase by the owner for this workspace.
    pub fn purchase(&self, products: &[(Product, u32)]) -> PurchaseRequest {
        PurchaseRequest {
            user_id: self.owner.id,
            workspace_id: self.workspace_id,
            products: products
                .iter()
                .map(|(p, q)| PurchasedProduct::new(*p, *q))
                .collect(),
            payment_ref: format!("pay-{}", Uuid::new_v4()),
            billing_customer_id: Some("cus_test".into()),
            ends_at: Utc::now() + Duration::days(30),
        }
    }

    /// The owner's request context.
    pub fn owner_ctx(&self) -> RequestContext {
        RequestContext::new(self.owner.id)
    }

    /// Register an identity and add it to the workspace.
    pub async fn add_member(&self, email: &str) -> Account {
        let account = self.identity.add_account(email, email);
        self.store
            .create_member(&Membership::new(
                self.workspace_id,
                account.id,
                WorkspaceRole::Member,
                MemberType::Invited,
            ))
            .await
            .expect("Failed to create membership");
        account
    }

    /// Seats currently held across the workspace's plan.
    pub async fn seats_in_use(&self) -> i64 {
        self.services
            .pool
            .usage(self.workspace_id)
            .await
            .expect("Failed to read usage")
            .seats_in_use
    }
}
