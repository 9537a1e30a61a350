//! Payment collaborator.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::money::Money;
use crate::orders::PaymentMethod;

/// Result of asking for payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved,
    Declined(String),
}

/// Opaque payment gateway: reports whether a charge went through.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(
        &self,
        method: PaymentMethod,
        amount: Money,
    ) -> Result<PaymentOutcome, BackendError>;
}

/// Approves every charge. Cash on delivery needs nothing more.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

#[async_trait]
impl PaymentGateway for AlwaysApprove {
    async fn authorize(
        &self,
        method: PaymentMethod,
        amount: Money,
    ) -> Result<PaymentOutcome, BackendError> {
        tracing::debug!(method = method.as_str(), %amount, "payment approved");
        Ok(PaymentOutcome::Approved)
    }
}
