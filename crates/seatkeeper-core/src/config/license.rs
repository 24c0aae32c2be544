//! Seat pool, invitation and allocation-authorization configuration.

use serde::{Deserialize, Serialize};

/// License system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// Lifetime of a pending invitation in seconds.
    #[serde(default = "default_invite_ttl")]
    pub invite_ttl_seconds: u64,
    /// Lifetime of an allocation authorization token in seconds.
    #[serde(default = "default_authorization_ttl")]
    pub authorization_ttl_seconds: u64,
    /// Length of the alphanumeric invite session code.
    #[serde(default = "default_session_code_length")]
    pub session_code_length: usize,
    /// Global resource ceilings a single plan may never exceed.
    #[serde(default)]
    pub ceilings: ResourceCeilings,
    /// Resources contributed by one purchased seat, per product.
    #[serde(default)]
    pub allowances: ProductAllowances,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            invite_ttl_seconds: default_invite_ttl(),
            authorization_ttl_seconds: default_authorization_ttl(),
            session_code_length: default_session_code_length(),
            ceilings: ResourceCeilings::default(),
            allowances: ProductAllowances::default(),
        }
    }
}

/// Upper bounds on the aggregate resources of one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCeilings {
    /// Maximum aggregate call time in minutes.
    #[serde(default = "default_max_call_time")]
    pub max_call_time_minutes: i64,
    /// Maximum aggregate storage in gigabytes.
    #[serde(default = "default_max_storage")]
    pub max_storage_gb: i64,
    /// Maximum aggregate download hits.
    #[serde(default = "default_max_download_hits")]
    pub max_download_hits: i64,
}

impl Default for ResourceCeilings {
    fn default() -> Self {
        Self {
            max_call_time_minutes: default_max_call_time(),
            max_storage_gb: default_max_storage(),
            max_download_hits: default_max_download_hits(),
        }
    }
}

/// Resources granted by one seat of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAllowance {
    /// Call time in minutes.
    #[serde(default)]
    pub call_time_minutes: i64,
    /// Storage in gigabytes.
    #[serde(default)]
    pub storage_gb: i64,
    /// Download hits.
    #[serde(default)]
    pub download_hits: i64,
}

/// Per-product allowance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAllowances {
    /// Remote-support product.
    #[serde(default = "default_remote")]
    pub remote: ProductAllowance,
    /// Meeting product.
    #[serde(default = "default_meeting")]
    pub meeting: ProductAllowance,
    /// Drive product.
    #[serde(default = "default_drive")]
    pub drive: ProductAllowance,
}

impl Default for ProductAllowances {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            meeting: default_meeting(),
            drive: default_drive(),
        }
    }
}

fn default_invite_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_authorization_ttl() -> u64 {
    30 * 60
}

fn default_session_code_length() -> usize {
    20
}

fn default_max_call_time() -> i64 {
    1_000_000
}

fn default_max_storage() -> i64 {
    100_000
}

fn default_max_download_hits() -> i64 {
    10_000_000
}

fn default_remote() -> ProductAllowance {
    ProductAllowance {
        call_time_minutes: 600,
        storage_gb: 0,
        download_hits: 0,
    }
}

fn default_meeting() -> ProductAllowance {
    ProductAllowance {
        call_time_minutes: 1_200,
        storage_gb: 1,
        download_hits: 0,
    }
}

fn default_drive() -> ProductAllowance {
    ProductAllowance {
        call_time_minutes: 0,
        storage_gb: 100,
        download_hits: 10_000,
    }
}
