//! End-to-end cart → checkout → order lifecycle tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use turbo_cache::{Cache, CacheError, KvStore, MemoryStore};
use turbo_cart::orders::{OrderCreateRequest, StatusUpdateRequest, PICKUP_NOTE};
use turbo_cart::prelude::*;

/// Local backend with switchable failures and call counters.
struct ScriptedBackend {
    inner: LocalOrderBackend,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
    fail_get: AtomicBool,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl ScriptedBackend {
    fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            inner: LocalOrderBackend::new(Cache::new(store), "backend:orders"),
            fail_create: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_get: AtomicBool::new(false),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OrderBackend for ScriptedBackend {
    async fn create_order(&self, request: &OrderCreateRequest) -> Result<Order, BackendError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BackendError::Timeout);
        }
        self.inner.create_order(request).await
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        request: &StatusUpdateRequest,
    ) -> Result<Order, BackendError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection reset".into()));
        }
        self.inner.update_status(order_id, request).await
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>, BackendError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(BackendError::Timeout);
        }
        self.inner.get_order(order_id).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, BackendError> {
        self.inner.list_orders().await
    }
}

/// Memory store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl KvStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::StoreError("disk full".into()));
        }
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.delete(key)
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.inner.keys()
    }
}

struct Decline;

#[async_trait]
impl PaymentGateway for Decline {
    async fn authorize(&self, _: PaymentMethod, _: Money) -> Result<PaymentOutcome, BackendError> {
        Ok(PaymentOutcome::Declined("insufficient funds".into()))
    }
}

struct Harness {
    store: Arc<dyn KvStore>,
    backend: Arc<ScriptedBackend>,
    shop: Storefront,
}

fn address() -> Address {
    Address::new("1 Rizal St", "Manila", "NCR", "1000", "Philippines").with_name("Juan", "Cruz")
}

fn signed_in() -> Arc<dyn IdentityProvider> {
    Arc::new(StaticIdentity::new(Some("token".into()), Some(address())))
}

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.retry.max_attempts = 1;
    config.retry.backoff_ms = 0;
    config
}

fn harness_with(identity: Arc<dyn IdentityProvider>, payments: Arc<dyn PaymentGateway>) -> Harness {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend::new(store.clone()));
    let shop = Storefront::open(
        config(),
        store.clone(),
        Collaborators {
            backend: backend.clone(),
            identity,
            payments,
        },
    );
    Harness { store, backend, shop }
}

fn harness() -> Harness {
    harness_with(signed_in(), Arc::new(AlwaysApprove))
}

fn product(id: &str, cents: i64) -> CartProduct {
    CartProduct::new(id, format!("Item {}", id), Money::new(cents))
}

#[tokio::test]
async fn test_pickup_checkout_creates_store_pickup_order() {
    let mut h = harness();
    h.shop.cart_mut().add_one(product("A", 100), 2).unwrap();

    let draft = h.shop.begin_checkout(Some(DeliveryMethod::Pickup), None).unwrap();
    let order = h.shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap();

    assert_eq!(order.status(), OrderStatus::StorePickup);
    assert_eq!(order.sub_status(), SubStatus::AwaitingArrival);
    assert_eq!(order.items()[0].line_total, Money::new(200));
    assert_eq!(order.total(), Money::new(200));
    assert_eq!(order.note(), Some(PICKUP_NOTE));
    assert_eq!(
        order.delivery_details().address,
        "1 Rizal St, Manila, NCR, 1000, Philippines"
    );
    assert!(order.order_id().as_str().starts_with("ORD-"));

    assert!(h.shop.cart().is_empty());
    assert!(h.shop.checkout().resume_draft().is_none());
    assert_eq!(h.shop.orders().list().len(), 1);
}

#[tokio::test]
async fn test_delivery_checkout_starts_to_ship() {
    let mut h = harness();
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();

    let draft = h
        .shop
        .begin_checkout(Some(DeliveryMethod::Delivery), Some("Leave at the gate".into()))
        .unwrap();
    let order = h.shop.proceed_to_payment(&draft, PaymentMethod::Gcash).await.unwrap();

    assert_eq!(order.status(), OrderStatus::ToShip);
    assert_eq!(order.sub_status(), SubStatus::Processing);
    assert_eq!(order.note(), Some("Leave at the gate"));
    assert_eq!(order.payment_details().method, PaymentMethod::Gcash);
}

#[tokio::test]
async fn test_empty_cart_never_creates_order() {
    let h = harness();
    let err = h.shop.begin_checkout(Some(DeliveryMethod::Pickup), None).unwrap_err();
    assert!(matches!(err, CommerceError::EmptyCart));
    assert_eq!(h.backend.creates.load(Ordering::SeqCst), 0);
    assert!(h.shop.orders().list().is_empty());
}

#[tokio::test]
async fn test_nothing_selected_counts_as_empty() {
    let mut h = harness();
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();
    h.shop.cart_mut().set_all_selected(false).unwrap();

    let err = h.shop.begin_checkout(Some(DeliveryMethod::Pickup), None).unwrap_err();
    assert!(matches!(err, CommerceError::EmptyCart));
}

#[tokio::test]
async fn test_missing_delivery_method() {
    let mut h = harness();
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();

    let err = h.shop.begin_checkout(None, None).unwrap_err();
    assert!(matches!(err, CommerceError::MissingDeliveryMethod));
    assert!(h.shop.checkout().resume_draft().is_none());
}

#[tokio::test]
async fn test_missing_address_blocks_before_backend() {
    let identity = Arc::new(StaticIdentity::new(Some("token".into()), None));
    let mut h = harness_with(identity, Arc::new(AlwaysApprove));
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();

    let draft = h.shop.begin_checkout(Some(DeliveryMethod::Delivery), None).unwrap();
    let err = h.shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap_err();

    assert!(matches!(err, CommerceError::MissingAddress));
    assert_eq!(h.backend.creates.load(Ordering::SeqCst), 0);
    assert_eq!(h.shop.cart().count(), 1);
    assert_eq!(h.shop.checkout().resume_draft(), Some(draft));
}

#[tokio::test]
async fn test_incomplete_address_counts_as_missing() {
    let partial = Address::new("", "Manila", "NCR", "1000", "Philippines");
    let identity = Arc::new(StaticIdentity::new(Some("token".into()), Some(partial)));
    let mut h = harness_with(identity, Arc::new(AlwaysApprove));
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();

    let draft = h.shop.begin_checkout(Some(DeliveryMethod::Delivery), None).unwrap();
    let err = h.shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap_err();
    assert!(matches!(err, CommerceError::MissingAddress));
}

#[tokio::test]
async fn test_missing_credential() {
    let identity = Arc::new(StaticIdentity::new(None, Some(address())));
    let mut h = harness_with(identity, Arc::new(AlwaysApprove));
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();

    let draft = h.shop.begin_checkout(Some(DeliveryMethod::Pickup), None).unwrap();
    let err = h.shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap_err();
    assert!(matches!(err, CommerceError::MissingCredential));
    assert_eq!(h.backend.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_declined_payment_keeps_cart() {
    let mut h = harness_with(signed_in(), Arc::new(Decline));
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();

    let draft = h.shop.begin_checkout(Some(DeliveryMethod::Pickup), None).unwrap();
    let err = h.shop.proceed_to_payment(&draft, PaymentMethod::Card).await.unwrap_err();

    assert!(matches!(err, CommerceError::PaymentDeclined(_)));
    assert_eq!(h.backend.creates.load(Ordering::SeqCst), 0);
    assert_eq!(h.shop.cart().count(), 1);
}

#[tokio::test]
async fn test_backend_failure_leaves_cart_and_draft_and_is_not_retried() {
    let mut h = harness();
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();
    h.backend.fail_create.store(true, Ordering::SeqCst);

    let draft = h.shop.begin_checkout(Some(DeliveryMethod::Pickup), None).unwrap();
    let err = h.shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap_err();

    assert!(matches!(err, CommerceError::BackendUnavailable(_)));
    assert!(err.is_retryable());
    assert_eq!(h.backend.creates.load(Ordering::SeqCst), 1);
    assert_eq!(h.shop.cart().count(), 1);
    assert_eq!(h.shop.checkout().resume_draft(), Some(draft.clone()));
    assert!(h.shop.orders().list().is_empty());

    // The shopper retries by hand.
    h.backend.fail_create.store(false, Ordering::SeqCst);
    h.shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap();
    assert!(h.shop.cart().is_empty());
}

#[tokio::test]
async fn test_draft_is_frozen_and_unselected_lines_survive() {
    let mut h = harness();
    h.shop.cart_mut().add_one(product("A", 100), 2).unwrap();
    h.shop.cart_mut().add_one(product("B", 999), 1).unwrap();
    h.shop.cart_mut().toggle_selected(&ProductId::new("B")).unwrap();

    let draft = h.shop.begin_checkout(Some(DeliveryMethod::Delivery), None).unwrap();
    assert_eq!(draft.items().len(), 1);

    // Edits after drafting don't reach the draft.
    h.shop.cart_mut().set_quantity(&ProductId::new("A"), 5).unwrap();
    let order = h.shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap();

    assert_eq!(order.items()[0].quantity, 2);
    assert_eq!(order.total(), Money::new(200));
    let remaining: Vec<_> = h.shop.cart().lines().iter().map(|l| l.product_id.as_str()).collect();
    assert_eq!(remaining, vec!["B"]);
}

#[tokio::test]
async fn test_payment_clears_drafted_lines_not_current_selection() {
    let mut h = harness();
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();
    h.shop.cart_mut().add_one(product("B", 999), 1).unwrap();
    h.shop.cart_mut().toggle_selected(&ProductId::new("B")).unwrap();
    let draft = h.shop.begin_checkout(Some(DeliveryMethod::Pickup), None).unwrap();

    // Selection flips between drafting and paying.
    h.shop.cart_mut().toggle_selected(&ProductId::new("A")).unwrap();
    h.shop.cart_mut().toggle_selected(&ProductId::new("B")).unwrap();
    let order = h.shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap();

    assert_eq!(order.items()[0].product_id, ProductId::new("A"));
    let remaining: Vec<_> = h.shop.cart().lines().iter().map(|l| l.product_id.as_str()).collect();
    assert_eq!(remaining, vec!["B"]);
    assert!(h.shop.cart().line(&ProductId::new("B")).unwrap().selected);
}

#[tokio::test]
async fn test_draft_survives_reload() {
    let h = harness();
    let mut shop = h.shop;
    shop.cart_mut().add_one(product("A", 100), 1).unwrap();
    let draft = shop.begin_checkout(Some(DeliveryMethod::Pickup), Some("thanks".into())).unwrap();

    let reopened = Storefront::local(config(), h.store.clone(), signed_in());
    assert_eq!(reopened.checkout().resume_draft(), Some(draft));
    assert_eq!(reopened.cart().count(), 1);
}

async fn placed_order(h: &mut Harness, method: DeliveryMethod) -> Order {
    h.shop.cart_mut().add_one(product("A", 100), 1).unwrap();
    let draft = h.shop.begin_checkout(Some(method), None).unwrap();
    h.shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap()
}

#[tokio::test]
async fn test_cancel_then_cancel_again() {
    let mut h = harness();
    let order = placed_order(&mut h, DeliveryMethod::Delivery).await;
    let id = order.order_id().clone();

    let cancelled = h
        .shop
        .update_status(&id, StatusAction::cancel("changed mind"))
        .await
        .unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason(), Some("changed mind"));
    assert!(cancelled.updated_at().is_some());

    let err = h
        .shop
        .update_status(&id, StatusAction::cancel("again"))
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::IllegalTransition { .. }));
    // Rejected locally; the backend saw only the first update.
    assert_eq!(h.backend.updates.load(Ordering::SeqCst), 1);
    assert_eq!(h.shop.orders().get(&id).unwrap(), cancelled);
}

#[tokio::test]
async fn test_mark_received_requires_to_receive() {
    let mut h = harness();
    let order = placed_order(&mut h, DeliveryMethod::Delivery).await;
    let id = order.order_id().clone();

    let err = h.shop.update_status(&id, StatusAction::MarkReceived).await.unwrap_err();
    assert!(matches!(err, CommerceError::IllegalTransition { .. }));

    h.shop.update_status(&id, StatusAction::Dispatch).await.unwrap();
    let done = h.shop.update_status(&id, StatusAction::MarkReceived).await.unwrap();
    assert_eq!(done.status(), OrderStatus::Completed);
    assert_eq!(done.sub_status(), SubStatus::OrderCompleted);
}

#[tokio::test]
async fn test_failed_update_reconciles_with_backend() {
    let mut h = harness();
    let order = placed_order(&mut h, DeliveryMethod::Delivery).await;
    let id = order.order_id().clone();
    h.backend.fail_update.store(true, Ordering::SeqCst);

    let change = h
        .shop
        .orders()
        .apply_local(&id, StatusAction::cancel("Change of mind"))
        .unwrap();
    // Optimistic state is visible before confirmation.
    assert_eq!(h.shop.orders().get(&id).unwrap().status(), OrderStatus::Cancelled);

    let err = h.shop.orders().confirm(change).await.unwrap_err();
    assert!(matches!(err, CommerceError::BackendUnavailable(_)));

    let local = h.shop.orders().get(&id).unwrap();
    assert_eq!(local.status(), OrderStatus::ToShip);
    assert_eq!(local.cancel_reason(), None);
}

#[tokio::test]
async fn test_failed_update_and_refetch_restores_previous() {
    let mut h = harness();
    let order = placed_order(&mut h, DeliveryMethod::Pickup).await;
    let id = order.order_id().clone();
    h.backend.fail_update.store(true, Ordering::SeqCst);
    h.backend.fail_get.store(true, Ordering::SeqCst);

    let err = h
        .shop
        .update_status(&id, StatusAction::cancel("Others"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(h.shop.orders().get(&id).unwrap(), order);
}

#[tokio::test]
async fn test_backend_error_survives_failed_reconciliation() {
    let flaky = Arc::new(FlakyStore::default());
    let store: Arc<dyn KvStore> = flaky.clone();
    let backend = Arc::new(ScriptedBackend::new(store.clone()));
    let mut h = Harness {
        store: store.clone(),
        backend: backend.clone(),
        shop: Storefront::open(
            config(),
            store,
            Collaborators {
                backend,
                identity: signed_in(),
                payments: Arc::new(AlwaysApprove),
            },
        ),
    };
    let order = placed_order(&mut h, DeliveryMethod::Delivery).await;
    let id = order.order_id().clone();
    h.backend.fail_update.store(true, Ordering::SeqCst);

    let change = h
        .shop
        .orders()
        .apply_local(&id, StatusAction::cancel("Others"))
        .unwrap();
    flaky.fail_writes.store(true, Ordering::SeqCst);

    let err = h.shop.orders().confirm(change).await.unwrap_err();
    assert!(matches!(err, CommerceError::BackendUnavailable(_)));
    assert!(err.is_retryable());
    assert_eq!(h.backend.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_order() {
    let h = harness();
    let missing = OrderId::new("ORD-0000000000001");
    assert!(h.shop.orders().get(&missing).is_none());
    let err = h.shop.update_status(&missing, StatusAction::Dispatch).await.unwrap_err();
    assert!(matches!(err, CommerceError::OrderNotFound(_)));
}

#[tokio::test]
async fn test_orders_listed_newest_first_with_unique_ids() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let cache = Cache::new(store.clone());
    let backend = Arc::new(LocalOrderBackend::new(cache.clone(), "backend:orders"));
    let frozen = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    let repo = OrderRepository::new(cache.clone(), "orders", backend).with_clock(move || frozen);

    let mut cart = CartStore::open(cache, "cart");
    cart.add_one(product("A", 100), 1).unwrap();
    let draft = OrderDraft::new(cart.lines().to_vec(), DeliveryMethod::Delivery, None, frozen);
    let delivery = turbo_cart::orders::DeliveryDetails {
        method: DeliveryMethod::Delivery,
        address: "addr".into(),
        billing: "addr".into(),
    };

    let mut created = Vec::new();
    for _ in 0..3 {
        created.push(repo.create(&draft, PaymentMethod::Cod, delivery.clone()).await.unwrap());
    }

    let listed: Vec<_> = repo.list().iter().map(|o| o.order_id().to_string()).collect();
    assert_eq!(
        listed,
        vec!["ORD-1700000000002", "ORD-1700000000001", "ORD-1700000000000"]
    );
    assert_eq!(repo.total_spent(), Money::new(300));
    assert_eq!(repo.list_by_status(OrderStatus::ToShip).len(), 3);
}

#[tokio::test]
async fn test_refresh_pulls_backend_list() {
    let mut h = harness();
    placed_order(&mut h, DeliveryMethod::Delivery).await;

    // Wipe the local copy; the backend still has it.
    h.store.delete("orders").unwrap();
    assert!(h.shop.orders().list().is_empty());

    let orders = h.shop.orders().refresh().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(h.shop.orders().list(), orders);
}

#[tokio::test]
async fn test_corrupt_order_list_reads_empty() {
    let h = harness();
    h.store.set("orders", b"not json").unwrap();
    assert!(h.shop.orders().list().is_empty());
}

#[tokio::test]
async fn test_buy_again() {
    let mut h = harness();
    let order = placed_order(&mut h, DeliveryMethod::Delivery).await;
    let id = order.order_id().clone();

    let err = h.shop.buy_again(&id).unwrap_err();
    assert!(matches!(err, CommerceError::ReorderNotAllowed(_)));

    h.shop
        .update_status(&id, StatusAction::cancel("Ordered wrong item"))
        .await
        .unwrap();
    let outcomes = h.shop.buy_again(&id).unwrap();
    assert_eq!(outcomes, vec![AddOutcome::Inserted]);
    assert_eq!(h.shop.cart().line(&ProductId::new("A")).unwrap().quantity, 1);
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let open = || {
        let store: Arc<dyn KvStore> = Arc::new(turbo_cache::FileStore::open(dir.path()).unwrap());
        Storefront::local(config(), store, signed_in())
    };

    let mut shop = open();
    shop.cart_mut()
        .add_one(product("A", 100).with_attribute("size", "M"), 2)
        .unwrap();
    shop.cart_mut().add_one(product("B", 50), 1).unwrap();
    shop.cart_mut().toggle_selected(&ProductId::new("B")).unwrap();
    let draft = shop.begin_checkout(Some(DeliveryMethod::Delivery), None).unwrap();
    let order = shop.proceed_to_payment(&draft, PaymentMethod::Cod).await.unwrap();
    drop(shop);

    let shop = open();
    assert_eq!(shop.orders().get(order.order_id()), Some(order));
    let line = shop.cart().line(&ProductId::new("B")).unwrap();
    assert!(!line.selected);
    assert_eq!(shop.cart().count(), 1);
}
