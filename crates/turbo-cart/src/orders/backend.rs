//! The order backend boundary.

use async_trait::async_trait;
use chrono::Utc;
use turbo_cache::Cache;

use crate::error::{BackendError, CommerceError};
use crate::ids::OrderId;
use crate::orders::{transition, Order, OrderCreateRequest, StatusAction, StatusUpdateRequest};

/// Remote store of record for orders.
///
/// Implementations report transport failures and timeouts as
/// [`BackendError`]; the engine treats both the same.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    /// Store a fully formed order and return the acknowledged copy.
    async fn create_order(&self, request: &OrderCreateRequest) -> Result<Order, BackendError>;

    /// Apply a status change and return the updated order.
    async fn update_status(
        &self,
        order_id: &OrderId,
        request: &StatusUpdateRequest,
    ) -> Result<Order, BackendError>;

    /// Fetch one order.
    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, BackendError>;

    /// Fetch every order, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, BackendError>;
}

/// Order backend kept in a key-value store.
///
/// Stands in for a remote service when running offline. Status updates are
/// validated with the same status machine the engine uses.
#[derive(Debug, Clone)]
pub struct LocalOrderBackend {
    cache: Cache,
    key: String,
}

impl LocalOrderBackend {
    pub fn new(cache: Cache, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }

    fn load(&self) -> Result<Vec<Order>, BackendError> {
        self.cache
            .get::<Vec<Order>>(&self.key)
            .map(Option::unwrap_or_default)
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    fn save(&self, orders: &[Order]) -> Result<(), BackendError> {
        self.cache
            .set(&self.key, orders)
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl OrderBackend for LocalOrderBackend {
    async fn create_order(&self, request: &OrderCreateRequest) -> Result<Order, BackendError> {
        let mut orders = self.load()?;
        if orders.iter().any(|o| o.order_id() == &request.order_id) {
            return Err(BackendError::Rejected {
                status: 409,
                message: format!("order {} already exists", request.order_id),
            });
        }
        let order = Order::from(request.clone());
        orders.insert(0, order.clone());
        self.save(&orders)?;
        Ok(order)
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        request: &StatusUpdateRequest,
    ) -> Result<Order, BackendError> {
        let mut orders = self.load()?;
        let slot = orders
            .iter_mut()
            .find(|o| o.order_id() == order_id)
            .ok_or_else(|| BackendError::Rejected {
                status: 404,
                message: format!("order {} not found", order_id),
            })?;

        let action = StatusAction::from_request(request).ok_or_else(|| BackendError::Rejected {
            status: 400,
            message: format!("cannot move an order to {}", request.status),
        })?;
        let updated = transition(slot, &action, Utc::now()).map_err(|e| match e {
            CommerceError::IllegalTransition { .. } => BackendError::Rejected {
                status: 400,
                message: e.to_string(),
            },
            other => BackendError::Unavailable(other.to_string()),
        })?;

        *slot = updated.clone();
        self.save(&orders)?;
        Ok(updated)
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, BackendError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|o| o.order_id() == order_id))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, BackendError> {
        self.load()
    }
}
