//! Identity provider boundary.

use async_trait::async_trait;

use crate::checkout::Address;
use crate::error::BackendError;

/// Supplies the shopper's credential and addresses.
///
/// Both are opaque to the engine; it only checks that they exist.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Bearer credential, if signed in.
    async fn bearer_token(&self) -> Result<Option<String>, BackendError>;

    /// Delivery address on file.
    async fn delivery_address(&self) -> Result<Option<Address>, BackendError>;

    /// Billing address; defaults to the delivery address.
    async fn billing_address(&self) -> Result<Option<Address>, BackendError> {
        self.delivery_address().await
    }
}

/// Identity with a fixed credential and address.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    token: Option<String>,
    address: Option<Address>,
    billing: Option<Address>,
}

impl StaticIdentity {
    pub fn new(token: Option<String>, address: Option<Address>) -> Self {
        Self {
            token,
            address,
            billing: None,
        }
    }

    pub fn with_billing(mut self, billing: Address) -> Self {
        self.billing = Some(billing);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn bearer_token(&self) -> Result<Option<String>, BackendError> {
        Ok(self.token.clone())
    }

    async fn delivery_address(&self) -> Result<Option<Address>, BackendError> {
        Ok(self.address.clone())
    }

    async fn billing_address(&self) -> Result<Option<Address>, BackendError> {
        Ok(self.billing.clone().or_else(|| self.address.clone()))
    }
}
