//! Billing collaborator.

use async_trait::async_trait;

use crate::error::ClientError;

/// Recurring-charge control on the payment service.
#[async_trait]
pub trait BillingService: Send + Sync + std::fmt::Debug {
    /// Cancel the recurring subscription of a billing customer.
    async fn cancel_subscription(&self, customer_id: &str) -> Result<(), ClientError>;
}
