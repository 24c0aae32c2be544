//! Service wiring shared by the server binary, the CLI and the tests.

use std::sync::Arc;

use seatkeeper_cache::CacheManager;
use seatkeeper_client::Collaborators;
use seatkeeper_core::config::LicenseConfig;
use seatkeeper_database::store::{LicenseStore, MembershipStore};

use crate::authorization::AllocationAuthorizationCache;
use crate::invite::PendingInviteStore;
use crate::membership::MembershipOrchestrator;
use crate::pool::LicensePoolManager;

/// Every service, built once from its dependencies.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    /// Seat pool manager.
    pub pool: LicensePoolManager,
    /// Pending invitations.
    pub invites: PendingInviteStore,
    /// Allocation authorization tokens.
    pub authorizations: AllocationAuthorizationCache,
    /// Membership workflows.
    pub memberships: MembershipOrchestrator,
}

impl ServiceRegistry {
    /// Build the services over the given stores, cache and collaborators.
    pub fn new(
        licenses: Arc<dyn LicenseStore>,
        members: Arc<dyn MembershipStore>,
        cache: CacheManager,
        collaborators: Collaborators,
        config: &LicenseConfig,
    ) -> Self {
        let pool = LicensePoolManager::new(licenses, config.allowances);
        let invites = PendingInviteStore::new(cache.clone(), config);
        let authorizations = AllocationAuthorizationCache::new(cache, pool.clone(), config);
        let memberships =
            MembershipOrchestrator::new(pool.clone(), members, invites.clone(), collaborators);
        Self {
            pool,
            invites,
            authorizations,
            memberships,
        }
    }
}
