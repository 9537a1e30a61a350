//! The checkout pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cart::{AddOutcome, CartProduct, CartStore};
use crate::checkout::{DraftStore, IdentityProvider, OrderDraft, PaymentGateway, PaymentOutcome};
use crate::error::{CommerceError, Result};
use crate::ids::ProductId;
use crate::orders::{DeliveryDetails, DeliveryMethod, Order, OrderRepository, PaymentMethod};

/// Drives a cart through draft, payment and order creation.
///
/// Every local precondition is checked before any backend call. The order
/// is recorded before the cart is cleared, and creation is never retried.
pub struct CheckoutAssembler {
    drafts: DraftStore,
    identity: Arc<dyn IdentityProvider>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl CheckoutAssembler {
    pub fn new(
        drafts: DraftStore,
        identity: Arc<dyn IdentityProvider>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            drafts,
            identity,
            payments,
            clock: Arc::new(Utc::now),
        }
    }

    /// Override the time source.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Snapshot the selected lines into a draft and save it.
    ///
    /// Fails with [`CommerceError::EmptyCart`] when the cart has no lines or
    /// none are selected, and with [`CommerceError::MissingDeliveryMethod`]
    /// when no delivery method was chosen.
    pub fn begin_checkout(
        &self,
        cart: &CartStore,
        delivery_method: Option<DeliveryMethod>,
        note: Option<String>,
    ) -> Result<OrderDraft> {
        if cart.count() == 0 {
            return Err(CommerceError::EmptyCart);
        }
        let delivery_method = delivery_method.ok_or(CommerceError::MissingDeliveryMethod)?;

        let items: Vec<_> = cart.selected_lines().cloned().collect();
        if items.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let draft = OrderDraft::new(items, delivery_method, note, (self.clock)());
        self.drafts.save(&draft)?;
        tracing::info!(
            lines = draft.items().len(),
            total = %draft.total(),
            delivery = delivery_method.as_str(),
            "checkout started"
        );
        Ok(draft)
    }

    /// The draft saved by an earlier `begin_checkout`, if still pending.
    pub fn resume_draft(&self) -> Option<OrderDraft> {
        self.drafts.load()
    }

    /// Abandon the pending draft.
    pub fn discard_draft(&self) -> Result<()> {
        self.drafts.discard()
    }

    /// Pay for `draft` and turn it into an order.
    ///
    /// Credential and address are resolved first; without them nothing is
    /// sent anywhere. If payment or order creation fails, the cart and the
    /// draft are left as they were so the shopper can try again.
    #[tracing::instrument(skip_all, fields(payment = payment.as_str()))]
    pub async fn proceed_to_payment(
        &self,
        cart: &mut CartStore,
        orders: &OrderRepository,
        draft: &OrderDraft,
        payment: PaymentMethod,
    ) -> Result<Order> {
        if self.identity.bearer_token().await?.is_none() {
            return Err(CommerceError::MissingCredential);
        }
        let address = match self.identity.delivery_address().await? {
            Some(address) if address.is_complete() => address,
            _ => return Err(CommerceError::MissingAddress),
        };
        let billing = self
            .identity
            .billing_address()
            .await?
            .filter(|billing| billing.is_complete())
            .unwrap_or_else(|| address.clone());

        if let PaymentOutcome::Declined(reason) =
            self.payments.authorize(payment, draft.total()).await?
        {
            tracing::warn!(%reason, "payment declined");
            return Err(CommerceError::PaymentDeclined(reason));
        }

        let delivery = DeliveryDetails {
            method: draft.delivery_method(),
            address: address.one_line(),
            billing: billing.one_line(),
        };
        let order = orders.create(draft, payment, delivery).await?;

        // The order is durable from here on; cleanup failures must not hide it.
        let checked_out: Vec<ProductId> = draft.items().iter().map(|l| l.product_id.clone()).collect();
        if let Err(e) = cart.remove_products(&checked_out) {
            tracing::error!(order_id = %order.order_id(), error = %e, "failed to clear checked-out lines");
        }
        if let Err(e) = self.drafts.discard() {
            tracing::error!(order_id = %order.order_id(), error = %e, "failed to discard draft");
        }
        Ok(order)
    }

    /// Put an order's lines back into the cart.
    pub fn buy_again(&self, cart: &mut CartStore, order: &Order) -> Result<Vec<AddOutcome>> {
        if !order.status().can_reorder() {
            return Err(CommerceError::ReorderNotAllowed(order.status().to_string()));
        }
        let products = order.items().iter().map(|line| {
            let mut product = CartProduct::new(line.product_id.clone(), line.name.clone(), line.unit_price);
            product.attributes = line.attributes.clone();
            (product, line.quantity)
        });
        let outcomes = cart.add_many(products)?;
        tracing::info!(order_id = %order.order_id(), lines = outcomes.len(), "order added back to cart");
        Ok(outcomes)
    }
}

impl std::fmt::Debug for CheckoutAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutAssembler")
            .field("drafts", &self.drafts)
            .finish_non_exhaustive()
    }
}
