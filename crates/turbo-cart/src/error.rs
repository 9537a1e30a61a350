//! Commerce error types.

use thiserror::Error;

use crate::ids::{OrderId, ProductId};

/// Errors that can occur in cart, checkout and order operations.
///
/// Local validation failures (`EmptyCart`, `MissingDeliveryMethod`,
/// `MissingAddress`, `IllegalTransition`) are raised before any backend call.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Checkout was attempted with nothing to check out.
    #[error("Cart is empty")]
    EmptyCart,

    /// Checkout was attempted without choosing pickup or delivery.
    #[error("No delivery method selected")]
    MissingDeliveryMethod,

    /// The identity provider has no usable delivery address.
    #[error("No delivery address on file")]
    MissingAddress,

    /// The identity provider has no bearer credential.
    #[error("Not signed in")]
    MissingCredential,

    /// The status machine rejected a transition.
    #[error("Cannot {action} from {from}")]
    IllegalTransition { from: String, action: String },

    /// A product was offered to the cart with a price below zero.
    #[error("Negative price for {0}")]
    NegativePrice(ProductId),

    /// Persisted data could not be decoded. Recovered locally by callers.
    #[error("Corrupted data under '{key}': {reason}")]
    PersistenceCorruption { key: String, reason: String },

    /// A backend call failed or timed out.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The payment collaborator declined the charge.
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    /// An order id collided with an existing order.
    #[error("Duplicate order id: {0}")]
    DuplicateOrderId(OrderId),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Re-ordering is not offered for the order's status.
    #[error("Cannot buy again from an order that is {0}")]
    ReorderNotAllowed(String),

    /// Key-value store failure.
    #[error("Storage error: {0}")]
    Storage(#[from] turbo_cache::CacheError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CommerceError {
    /// Whether the failure is transient and the caller may try again.
    ///
    /// Order creation must never be retried automatically even when this
    /// returns true.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CommerceError::BackendUnavailable(_))
    }

    /// Whether the failure was raised locally, before any backend call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CommerceError::EmptyCart
                | CommerceError::MissingDeliveryMethod
                | CommerceError::MissingAddress
                | CommerceError::MissingCredential
                | CommerceError::IllegalTransition { .. }
                | CommerceError::NegativePrice(_)
        )
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::Serialization(e.to_string())
    }
}

/// Failures reported by remote collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Transport failure.
    #[error("Request failed: {0}")]
    Unavailable(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The backend answered with an error status.
    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl From<BackendError> for CommerceError {
    fn from(e: BackendError) -> Self {
        // Timeouts and failures are surfaced identically.
        CommerceError::BackendUnavailable(e.to_string())
    }
}

/// Result alias for engine operations.
pub type Result<T, E = CommerceError> = std::result::Result<T, E>;
