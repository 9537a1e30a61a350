//! Wiring of the cart, checkout and order components over one store.

use std::sync::Arc;

use turbo_cache::{Cache, KvStore};

use crate::cart::{AddOutcome, CartStore};
use crate::catalog::FilterComposer;
use crate::checkout::{
    AlwaysApprove, CheckoutAssembler, DraftStore, IdentityProvider, OrderDraft, PaymentGateway,
};
use crate::config::EngineConfig;
use crate::error::{CommerceError, Result};
use crate::ids::OrderId;
use crate::orders::{
    DeliveryMethod, LocalOrderBackend, Order, OrderBackend, OrderRepository, PaymentMethod,
    StatusAction,
};
use crate::retry::RetryPolicy;

/// External services the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub backend: Arc<dyn OrderBackend>,
    pub identity: Arc<dyn IdentityProvider>,
    pub payments: Arc<dyn PaymentGateway>,
}

/// One shopper session: cart, checkout and order history.
pub struct Storefront {
    config: EngineConfig,
    cart: CartStore,
    checkout: CheckoutAssembler,
    orders: OrderRepository,
    retry: RetryPolicy,
}

impl Storefront {
    /// Open every component against `store`, hydrating persisted state.
    pub fn open(config: EngineConfig, store: Arc<dyn KvStore>, collaborators: Collaborators) -> Self {
        let cache = Cache::new(store);
        let retry = RetryPolicy::from(&config.retry);
        let storage = &config.storage;

        let cart = CartStore::open(cache.clone(), storage.cart_key.clone());
        let checkout = CheckoutAssembler::new(
            DraftStore::new(cache.clone(), storage.draft_key.clone()),
            collaborators.identity,
            collaborators.payments,
        );
        let orders = OrderRepository::new(cache, storage.orders_key.clone(), collaborators.backend)
            .with_id_prefix(config.orders.id_prefix.clone())
            .with_retry_policy(retry.clone());

        Self {
            config,
            cart,
            checkout,
            orders,
            retry,
        }
    }

    /// Open with the key-value backed order backend and an approving gateway.
    pub fn local(
        config: EngineConfig,
        store: Arc<dyn KvStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let backend = LocalOrderBackend::new(
            Cache::new(store.clone()),
            config.storage.backend_key.clone(),
        );
        let collaborators = Collaborators {
            backend: Arc::new(backend),
            identity,
            payments: Arc::new(AlwaysApprove),
        };
        Self::open(config, store, collaborators)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    pub fn orders(&self) -> &OrderRepository {
        &self.orders
    }

    pub fn checkout(&self) -> &CheckoutAssembler {
        &self.checkout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// A fresh filter composer using the configured page size.
    pub fn filter_composer(&self) -> FilterComposer {
        FilterComposer::new(self.config.catalog.page_size)
    }

    pub fn begin_checkout(
        &self,
        delivery_method: Option<DeliveryMethod>,
        note: Option<String>,
    ) -> Result<OrderDraft> {
        self.checkout.begin_checkout(&self.cart, delivery_method, note)
    }

    pub async fn proceed_to_payment(
        &mut self,
        draft: &OrderDraft,
        payment: PaymentMethod,
    ) -> Result<Order> {
        self.checkout
            .proceed_to_payment(&mut self.cart, &self.orders, draft, payment)
            .await
    }

    pub async fn update_status(&self, order_id: &OrderId, action: StatusAction) -> Result<Order> {
        self.orders.update_status(order_id, action).await
    }

    pub fn buy_again(&mut self, order_id: &OrderId) -> Result<Vec<AddOutcome>> {
        let order = self
            .orders
            .get(order_id)
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.clone()))?;
        self.checkout.buy_again(&mut self.cart, &order)
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("cart_lines", &self.cart.count())
            .field("orders", &self.orders)
            .finish_non_exhaustive()
    }
}
