//! Order drafts and their transient persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use turbo_cache::Cache;

use crate::cart::CartLine;
use crate::error::Result;
use crate::money::Money;
use crate::orders::DeliveryMethod;

/// Frozen copy of the selected cart lines plus the delivery choice.
///
/// Later cart edits never reach a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    items: Vec<CartLine>,
    delivery_method: DeliveryMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order_note: Option<String>,
    subtotal: Money,
    discount: Money,
    shipping_fee: Money,
    total: Money,
    created_at: DateTime<Utc>,
}

impl OrderDraft {
    /// Build a draft. Blank notes are dropped.
    pub fn new(
        items: Vec<CartLine>,
        delivery_method: DeliveryMethod,
        order_note: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let subtotal: Money = items.iter().map(CartLine::line_total).sum();
        let discount = Money::ZERO;
        let shipping_fee = Money::ZERO;
        Self {
            items,
            delivery_method,
            order_note: order_note
                .map(|note| note.trim().to_string())
                .filter(|note| !note.is_empty()),
            subtotal,
            discount,
            shipping_fee,
            total: subtotal - discount + shipping_fee,
            created_at,
        }
    }

    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn delivery_method(&self) -> DeliveryMethod {
        self.delivery_method
    }

    pub fn order_note(&self) -> Option<&str> {
        self.order_note.as_deref()
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Always zero for now.
    pub fn discount(&self) -> Money {
        self.discount
    }

    /// Always zero for now.
    pub fn shipping_fee(&self) -> Money {
        self.shipping_fee
    }

    /// `subtotal - discount + shipping_fee`.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Keeps the in-flight draft across reloads until it becomes an order.
#[derive(Debug, Clone)]
pub struct DraftStore {
    cache: Cache,
    key: String,
}

impl DraftStore {
    pub fn new(cache: Cache, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }

    pub fn save(&self, draft: &OrderDraft) -> Result<()> {
        self.cache.set(&self.key, draft)?;
        tracing::debug!(key = %self.key, lines = draft.items().len(), "draft saved");
        Ok(())
    }

    /// The saved draft, if any. An unreadable draft is dropped.
    pub fn load(&self) -> Option<OrderDraft> {
        match self.cache.get(&self.key) {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "discarding unreadable draft");
                None
            }
        }
    }

    pub fn discard(&self) -> Result<()> {
        self.cache.delete(&self.key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartProduct;
    use std::sync::Arc;
    use turbo_cache::MemoryStore;

    fn line(id: &str, cents: i64, quantity: i64) -> CartLine {
        CartProduct::new(id, id, Money::new(cents)).into_line(quantity)
    }

    #[test]
    fn test_draft_totals() {
        let draft = OrderDraft::new(
            vec![line("A", 100, 2), line("B", 250, 1)],
            DeliveryMethod::Pickup,
            None,
            Utc::now(),
        );
        assert_eq!(draft.subtotal(), Money::new(450));
        assert_eq!(draft.discount(), Money::ZERO);
        assert_eq!(draft.shipping_fee(), Money::ZERO);
        assert_eq!(draft.total(), Money::new(450));
    }

    #[test]
    fn test_blank_note_dropped() {
        let draft = OrderDraft::new(Vec::new(), DeliveryMethod::Delivery, Some("  ".into()), Utc::now());
        assert_eq!(draft.order_note(), None);

        let draft = OrderDraft::new(Vec::new(), DeliveryMethod::Delivery, Some(" ring twice ".into()), Utc::now());
        assert_eq!(draft.order_note(), Some("ring twice"));
    }

    #[test]
    fn test_draft_store_lifecycle() {
        let cache = Cache::new(Arc::new(MemoryStore::new()));
        let drafts = DraftStore::new(cache.clone(), "orderDetails");
        assert!(drafts.load().is_none());

        let draft = OrderDraft::new(vec![line("A", 100, 1)], DeliveryMethod::Pickup, None, Utc::now());
        drafts.save(&draft).unwrap();
        assert_eq!(drafts.load(), Some(draft));

        drafts.discard().unwrap();
        assert!(drafts.load().is_none());

        cache.store().set("orderDetails", b"garbage").unwrap();
        assert!(drafts.load().is_none());
    }
}
