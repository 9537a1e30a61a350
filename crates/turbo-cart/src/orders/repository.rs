//! Persisted order list and the boundary to the order backend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use turbo_cache::Cache;

use crate::checkout::OrderDraft;
use crate::error::{CommerceError, Result};
use crate::ids::{OrderId, OrderIdGenerator};
use crate::money::Money;
use crate::orders::{
    transition, DeliveryDetails, DeliveryMethod, Order, OrderBackend, OrderCreateRequest, OrderLine,
    OrderStatus, PaymentMethod, StatusAction, PICKUP_NOTE,
};
use crate::retry::RetryPolicy;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A status change applied locally and not yet confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub action: StatusAction,
    /// The order as it was before the change.
    pub previous: Order,
    /// The optimistic local result.
    pub updated: Order,
}

impl StatusChange {
    pub fn order_id(&self) -> &OrderId {
        self.updated.order_id()
    }
}

/// Stores orders locally (newest first) and mirrors them to the backend.
pub struct OrderRepository {
    cache: Cache,
    key: String,
    backend: Arc<dyn OrderBackend>,
    ids: OrderIdGenerator,
    retry: RetryPolicy,
    clock: Clock,
}

impl OrderRepository {
    /// Open the order list persisted under `key`.
    pub fn new(cache: Cache, key: impl Into<String>, backend: Arc<dyn OrderBackend>) -> Self {
        let repo = Self {
            cache,
            key: key.into(),
            backend,
            ids: OrderIdGenerator::default(),
            retry: RetryPolicy::default(),
            clock: Arc::new(Utc::now),
        };
        repo.observe_ids();
        repo
    }

    /// Use a different order id prefix.
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ids = OrderIdGenerator::new(prefix);
        self.observe_ids();
        self
    }

    /// Retry policy for read-only backend calls.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the time source.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Persist a new order built from `draft`.
    ///
    /// The backend is called once; a failed creation is surfaced and never
    /// retried here. Nothing is written locally unless the backend accepted
    /// the order.
    #[tracing::instrument(skip_all, fields(lines = draft.items().len()))]
    pub async fn create(
        &self,
        draft: &OrderDraft,
        payment: PaymentMethod,
        delivery: DeliveryDetails,
    ) -> Result<Order> {
        let now = (self.clock)();
        let order_id = self.ids.next(now);

        if self.load().iter().any(|o| o.order_id() == &order_id) {
            tracing::error!(order_id = %order_id, "order id collision");
            return Err(CommerceError::DuplicateOrderId(order_id));
        }

        let (status, sub_status) = OrderStatus::initial_for(delivery.method);
        let note = match (draft.order_note(), delivery.method) {
            (Some(note), _) => Some(note.to_string()),
            (None, DeliveryMethod::Pickup) => Some(PICKUP_NOTE.to_string()),
            (None, DeliveryMethod::Delivery) => None,
        };
        let request = OrderCreateRequest {
            order_id,
            order_date: now,
            items: draft.items().iter().map(OrderLine::from).collect(),
            total: draft.total(),
            payment_method: payment,
            delivery_method: delivery.method,
            status,
            sub_status,
            shipping_address: delivery.address,
            billing_address: delivery.billing,
            note,
        };

        let order = self.backend.create_order(&request).await.map_err(|e| {
            tracing::warn!(order_id = %request.order_id, error = %e, "order creation failed");
            CommerceError::from(e)
        })?;

        let mut orders = self.load();
        orders.retain(|o| o.order_id() != order.order_id());
        orders.insert(0, order.clone());
        self.save(&orders)?;
        self.ids.observe(order.order_id());

        tracing::info!(
            order_id = %order.order_id(),
            status = %order.status(),
            total = %order.total(),
            "order created"
        );
        Ok(order)
    }

    /// All orders, most recent first.
    pub fn list(&self) -> Vec<Order> {
        self.load()
    }

    /// Orders in one status, most recent first.
    pub fn list_by_status(&self, status: OrderStatus) -> Vec<Order> {
        self.load()
            .into_iter()
            .filter(|o| o.status() == status)
            .collect()
    }

    /// Sum of every order that wasn't cancelled.
    pub fn total_spent(&self) -> Money {
        self.load()
            .iter()
            .filter(|o| o.status() != OrderStatus::Cancelled)
            .map(Order::total)
            .sum()
    }

    /// Look up an order. Absence is `None`, never an error.
    pub fn get(&self, order_id: &OrderId) -> Option<Order> {
        self.load().into_iter().find(|o| o.order_id() == order_id)
    }

    /// Phase one of a status update: run the status machine and persist the
    /// optimistic result locally. Nothing is sent to the backend.
    pub fn apply_local(&self, order_id: &OrderId, action: StatusAction) -> Result<StatusChange> {
        let mut orders = self.load();
        let slot = orders
            .iter_mut()
            .find(|o| o.order_id() == order_id)
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.clone()))?;

        let updated = transition(slot, &action, (self.clock)())?;
        let previous = std::mem::replace(slot, updated.clone());
        self.save(&orders)?;

        Ok(StatusChange {
            action,
            previous,
            updated,
        })
    }

    /// Phase two: send the change to the backend.
    ///
    /// On success the backend's copy replaces the local one. On failure the
    /// local record is reconciled by re-fetching the order (falling back to
    /// the pre-change snapshot if the re-fetch fails too), and the backend
    /// error is returned even when that reconciliation cannot be saved.
    #[tracing::instrument(skip_all, fields(order_id = %change.order_id(), action = change.action.name()))]
    pub async fn confirm(&self, change: StatusChange) -> Result<Order> {
        let request = change.action.to_request();
        match self.backend.update_status(change.order_id(), &request).await {
            Ok(acknowledged) => {
                self.replace_local(acknowledged.clone(), &change.updated)?;
                tracing::info!(status = %acknowledged.status(), "status update confirmed");
                Ok(acknowledged)
            }
            Err(e) => {
                tracing::warn!(error = %e, "status update failed; reconciling");
                if let Err(local) = self.reconcile_after_failure(&change).await {
                    tracing::error!(error = %local, "reconciliation failed; local copy may be stale");
                }
                Err(e.into())
            }
        }
    }

    /// Apply a status change locally, then confirm it with the backend.
    pub async fn update_status(&self, order_id: &OrderId, action: StatusAction) -> Result<Order> {
        let change = self.apply_local(order_id, action)?;
        self.confirm(change).await
    }

    /// Replace the local list with the backend's, retrying transient failures.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self) -> Result<Vec<Order>> {
        let backend = &self.backend;
        let mut orders = self
            .retry
            .run("list orders", || backend.list_orders())
            .await?;
        orders.sort_by(|a, b| b.order_id().cmp(a.order_id()));
        self.save(&orders)?;
        for order in &orders {
            self.ids.observe(order.order_id());
        }
        tracing::debug!(orders = orders.len(), "order list refreshed");
        Ok(orders)
    }

    /// Re-fetch one order and overwrite the local copy.
    ///
    /// Returns `None` when the backend no longer knows the order; the local
    /// copy is left alone in that case.
    pub async fn reconcile(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let remote = self.fetch(order_id).await?;
        if let Some(order) = &remote {
            self.overwrite(order.clone())?;
        }
        Ok(remote)
    }

    async fn fetch(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let backend = &self.backend;
        Ok(self
            .retry
            .run("get order", || backend.get_order(order_id))
            .await?)
    }

    async fn reconcile_after_failure(&self, change: &StatusChange) -> Result<()> {
        match self.fetch(change.order_id()).await {
            Ok(Some(remote)) => {
                tracing::info!(status = %remote.status(), "reconciled with backend copy");
                self.overwrite(remote)
            }
            Ok(None) => {
                tracing::warn!("backend has no copy; restoring previous local state");
                self.overwrite(change.previous.clone())
            }
            Err(e) => {
                tracing::error!(error = %e, "re-fetch failed; restoring previous local state");
                self.overwrite(change.previous.clone())
            }
        }
    }

    /// Swap in the backend's copy unless a newer local change landed meanwhile.
    fn replace_local(&self, acknowledged: Order, expected: &Order) -> Result<()> {
        let mut orders = self.load();
        if let Some(slot) = orders
            .iter_mut()
            .find(|o| o.order_id() == acknowledged.order_id())
        {
            if *slot != *expected {
                tracing::debug!("local order moved on; backend copy wins");
            }
            *slot = acknowledged;
        }
        self.save(&orders)
    }

    fn overwrite(&self, order: Order) -> Result<()> {
        let mut orders = self.load();
        match orders.iter_mut().find(|o| o.order_id() == order.order_id()) {
            Some(slot) => *slot = order,
            None => {
                orders.push(order);
                orders.sort_by(|a, b| b.order_id().cmp(a.order_id()));
            }
        }
        self.save(&orders)
    }

    fn load(&self) -> Vec<Order> {
        match self.cache.get::<Vec<Order>>(&self.key) {
            Ok(orders) => orders.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "discarding unreadable order list");
                Vec::new()
            }
        }
    }

    fn save(&self, orders: &[Order]) -> Result<()> {
        self.cache.set(&self.key, orders)?;
        Ok(())
    }

    fn observe_ids(&self) {
        for order in self.load() {
            self.ids.observe(order.order_id());
        }
    }
}

impl std::fmt::Debug for OrderRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderRepository")
            .field("key", &self.key)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}
