//! The persisted cart store.

use std::collections::HashSet;

use turbo_cache::Cache;

use crate::cart::{AddOutcome, CartLine, CartProduct};
use crate::error::{CommerceError, Result};
use crate::ids::ProductId;
use crate::money::Money;

/// Owns the cart lines and keeps them persisted.
///
/// Hydrates from the key-value store on construction and writes the full
/// snapshot back after every mutation, before returning to the caller. Lines
/// are only reachable read-only; every change goes through a mutator.
#[derive(Debug)]
pub struct CartStore {
    lines: Vec<CartLine>,
    cache: Cache,
    key: String,
}

impl CartStore {
    /// Open the cart persisted under `key`, or an empty cart.
    ///
    /// Unreadable or malformed snapshots are logged and replaced by an empty
    /// cart; opening never fails.
    pub fn open(cache: Cache, key: impl Into<String>) -> Self {
        let key = key.into();
        let lines = match load_lines(&cache, &key) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding unreadable cart snapshot");
                Vec::new()
            }
        };
        tracing::debug!(key = %key, lines = lines.len(), "cart hydrated");
        Self { lines, cache, key }
    }

    /// Add `quantity` of `product`, merging into an existing line.
    ///
    /// Quantities below 1 are raised to 1. New lines start selected. A
    /// negative price is rejected with [`CommerceError::NegativePrice`] and
    /// leaves the cart untouched.
    pub fn add_one(&mut self, product: CartProduct, quantity: i64) -> Result<AddOutcome> {
        check_price(&product)?;
        let outcome = self.merge(product, quantity);
        self.persist()?;
        Ok(outcome)
    }

    /// Apply [`add_one`](Self::add_one) to each product, then persist once.
    ///
    /// Prices are checked up front; one bad product rejects the whole batch.
    pub fn add_many<I>(&mut self, products: I) -> Result<Vec<AddOutcome>>
    where
        I: IntoIterator<Item = (CartProduct, i64)>,
    {
        let products: Vec<_> = products.into_iter().collect();
        for (product, _) in &products {
            check_price(product)?;
        }
        let outcomes = products
            .into_iter()
            .map(|(product, quantity)| self.merge(product, quantity))
            .collect();
        self.persist()?;
        Ok(outcomes)
    }

    /// Delete the line for `product_id`. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<bool> {
        let before = self.lines.len();
        self.lines.retain(|line| &line.product_id != product_id);
        let removed = self.lines.len() != before;
        self.persist()?;
        Ok(removed)
    }

    /// Shift a line's quantity by `delta`, never below 1.
    ///
    /// Returns the new quantity, or `None` if the product isn't in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, delta: i64) -> Result<Option<i64>> {
        let quantity = self.line_mut(product_id).map(|line| {
            line.quantity = line.quantity.saturating_add(delta).max(1);
            line.quantity
        });
        self.persist()?;
        Ok(quantity)
    }

    /// Flip a line's selection. Returns the new flag.
    pub fn toggle_selected(&mut self, product_id: &ProductId) -> Result<Option<bool>> {
        let selected = self.line_mut(product_id).map(|line| {
            line.selected = !line.selected;
            line.selected
        });
        self.persist()?;
        Ok(selected)
    }

    /// Select or deselect every line.
    pub fn set_all_selected(&mut self, selected: bool) -> Result<()> {
        for line in &mut self.lines {
            line.selected = selected;
        }
        self.persist()
    }

    /// Remove every selected line, returning what was removed.
    pub fn clear_selected(&mut self) -> Result<Vec<CartLine>> {
        let (removed, kept): (Vec<CartLine>, Vec<CartLine>) = std::mem::take(&mut self.lines)
            .into_iter()
            .partition(|line| line.selected);
        self.lines = kept;
        self.persist()?;
        Ok(removed)
    }

    /// Remove the lines for `ids`, whatever their selection, returning what was removed.
    ///
    /// Ids not in the cart are skipped.
    pub fn remove_products(&mut self, ids: &[ProductId]) -> Result<Vec<CartLine>> {
        let (removed, kept): (Vec<CartLine>, Vec<CartLine>) = std::mem::take(&mut self.lines)
            .into_iter()
            .partition(|line| ids.contains(&line.product_id));
        self.lines = kept;
        self.persist()?;
        Ok(removed)
    }

    /// Sum of every line.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Sum of selected lines only.
    pub fn selected_total(&self) -> Money {
        self.selected_lines().map(CartLine::line_total).sum()
    }

    /// Number of distinct lines, not summed quantity.
    pub fn count(&self) -> usize {
        self.lines.len()
    }

    pub fn selected_count(&self) -> usize {
        self.selected_lines().count()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True when the cart has lines and all of them are selected.
    pub fn all_selected(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|line| line.selected)
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }

    pub fn selected_lines(&self) -> impl Iterator<Item = &CartLine> + '_ {
        self.lines.iter().filter(|line| line.selected)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| &line.product_id == product_id)
    }

    fn merge(&mut self, product: CartProduct, quantity: i64) -> AddOutcome {
        let quantity = quantity.max(1);
        match self.line_mut(&product.id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(quantity);
                if product.attributes.is_empty() || product.attributes == line.attributes {
                    AddOutcome::Merged
                } else {
                    tracing::warn!(
                        product_id = %product.id,
                        "merged product with different attributes; keeping the existing line's"
                    );
                    AddOutcome::MergedWithConflictingAttributes
                }
            }
            None => {
                self.lines.push(product.into_line(quantity));
                AddOutcome::Inserted
            }
        }
    }

    fn persist(&self) -> Result<()> {
        self.cache.set(&self.key, &self.lines)?;
        tracing::debug!(key = %self.key, lines = self.lines.len(), "cart persisted");
        Ok(())
    }
}

fn check_price(product: &CartProduct) -> Result<()> {
    if product.unit_price.is_negative() {
        tracing::warn!(product_id = %product.id, price = %product.unit_price, "rejected negative price");
        return Err(CommerceError::NegativePrice(product.id.clone()));
    }
    Ok(())
}

fn load_lines(cache: &Cache, key: &str) -> Result<Vec<CartLine>> {
    let lines: Vec<CartLine> = match cache.get(key) {
        Ok(Some(lines)) => lines,
        Ok(None) => return Ok(Vec::new()),
        Err(e) if e.is_corruption() => {
            return Err(CommerceError::PersistenceCorruption {
                key: key.to_string(),
                reason: e.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let mut seen = HashSet::new();
    for line in &lines {
        let reason = if line.quantity < 1 {
            Some(format!("quantity {} for {}", line.quantity, line.product_id))
        } else if line.unit_price.is_negative() {
            Some(format!("negative price for {}", line.product_id))
        } else if !seen.insert(&line.product_id) {
            Some(format!("duplicate line for {}", line.product_id))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(CommerceError::PersistenceCorruption {
                key: key.to_string(),
                reason,
            });
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use turbo_cache::MemoryStore;

    fn cache() -> Cache {
        Cache::new(Arc::new(MemoryStore::new()))
    }

    fn product(id: &str, cents: i64) -> CartProduct {
        CartProduct::new(id, format!("Product {}", id), Money::new(cents))
    }

    fn id(s: &str) -> ProductId {
        ProductId::new(s)
    }

    #[test]
    fn test_add_one_inserts_selected_line() {
        let mut cart = CartStore::open(cache(), "cart");
        let outcome = cart.add_one(product("A", 100), 2).unwrap();

        assert_eq!(outcome, AddOutcome::Inserted);
        let line = cart.line(&id("A")).unwrap();
        assert_eq!(line.quantity, 2);
        assert!(line.selected);
    }

    #[test]
    fn test_add_one_merges_quantities() {
        let mut cart = CartStore::open(cache(), "cart");
        cart.add_one(product("A", 100), 2).unwrap();
        let outcome = cart.add_one(product("A", 100), 3).unwrap();

        assert_eq!(outcome, AddOutcome::Merged);
        assert_eq!(cart.count(), 1);
        assert_eq!(cart.line(&id("A")).unwrap().quantity, 5);
    }

    #[test]
    fn test_add_one_clamps_quantity() {
        let mut cart = CartStore::open(cache(), "cart");
        cart.add_one(product("A", 100), 0).unwrap();
        cart.add_one(product("A", 100), -4).unwrap();
        assert_eq!(cart.line(&id("A")).unwrap().quantity, 2);
    }

    #[test]
    fn test_add_one_flags_attribute_conflict() {
        let mut cart = CartStore::open(cache(), "cart");
        cart.add_one(product("A", 100).with_attribute("size", "M"), 1)
            .unwrap();
        let outcome = cart
            .add_one(product("A", 100).with_attribute("size", "L"), 1)
            .unwrap();

        assert_eq!(outcome, AddOutcome::MergedWithConflictingAttributes);
        let line = cart.line(&id("A")).unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.attribute("size"), Some("M"));
    }

    #[test]
    fn test_add_many_sums_per_product() {
        let mut cart = CartStore::open(cache(), "cart");
        let outcomes = cart
            .add_many(vec![
                (product("A", 100), 1),
                (product("B", 50), 2),
                (product("A", 100), 3),
            ])
            .unwrap();

        assert_eq!(
            outcomes,
            vec![AddOutcome::Inserted, AddOutcome::Inserted, AddOutcome::Merged]
        );
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.line(&id("A")).unwrap().quantity, 4);
        assert_eq!(cart.line(&id("B")).unwrap().quantity, 2);
    }

    #[test]
    fn test_negative_price_rejected_and_cart_survives_reopen() {
        let cache = cache();
        let mut cart = CartStore::open(cache.clone(), "cart");
        cart.add_one(product("A", 100), 3).unwrap();

        let err = cart.add_one(product("B", -1), 1).unwrap_err();
        assert!(matches!(err, CommerceError::NegativePrice(ref id) if id.as_str() == "B"));
        assert!(err.is_validation());

        let err = cart
            .add_many(vec![(product("C", 50), 1), (product("D", -500), 1)])
            .unwrap_err();
        assert!(matches!(err, CommerceError::NegativePrice(_)));

        // Nothing from the rejected calls reached the cart or the snapshot.
        assert_eq!(cart.count(), 1);
        let reopened = CartStore::open(cache, "cart");
        assert_eq!(reopened.count(), 1);
        assert_eq!(reopened.total(), Money::new(300));
    }

    #[test]
    fn test_zero_price_allowed() {
        let mut cart = CartStore::open(cache(), "cart");
        assert_eq!(cart.add_one(product("free", 0), 1).unwrap(), AddOutcome::Inserted);
    }

    #[test]
    fn test_remove_absent_is_not_an_error() {
        let mut cart = CartStore::open(cache(), "cart");
        cart.add_one(product("A", 100), 1).unwrap();

        assert!(!cart.remove(&id("missing")).unwrap());
        assert!(cart.remove(&id("A")).unwrap());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_floors_at_one() {
        let mut cart = CartStore::open(cache(), "cart");
        cart.add_one(product("A", 100), 3).unwrap();

        assert_eq!(cart.set_quantity(&id("A"), 2).unwrap(), Some(5));
        assert_eq!(cart.set_quantity(&id("A"), -1).unwrap(), Some(4));
        assert_eq!(cart.set_quantity(&id("A"), -100).unwrap(), Some(1));
        assert_eq!(cart.set_quantity(&id("A"), i64::MIN).unwrap(), Some(1));
        assert_eq!(cart.set_quantity(&id("missing"), 1).unwrap(), None);
    }

    #[test]
    fn test_selection_does_not_touch_quantities() {
        let mut cart = CartStore::open(cache(), "cart");
        cart.add_one(product("A", 100), 2).unwrap();
        cart.add_one(product("B", 50), 1).unwrap();

        assert_eq!(cart.toggle_selected(&id("A")).unwrap(), Some(false));
        assert_eq!(cart.selected_count(), 1);
        assert!(!cart.all_selected());

        cart.set_all_selected(true).unwrap();
        assert!(cart.all_selected());
        assert_eq!(cart.line(&id("A")).unwrap().quantity, 2);
    }

    #[test]
    fn test_totals() {
        let mut cart = CartStore::open(cache(), "cart");
        cart.add_one(product("A", 100), 2).unwrap();
        cart.add_one(product("B", 250), 1).unwrap();

        assert_eq!(cart.total(), Money::new(450));
        assert_eq!(cart.selected_total(), cart.total());

        cart.toggle_selected(&id("B")).unwrap();
        assert_eq!(cart.selected_total(), Money::new(200));

        cart.set_all_selected(false).unwrap();
        assert_eq!(cart.selected_total(), Money::ZERO);
        assert_eq!(cart.total(), Money::new(450));
    }

    #[test]
    fn test_clear_selected_keeps_unselected() {
        let mut cart = CartStore::open(cache(), "cart");
        cart.add_one(product("A", 100), 2).unwrap();
        cart.add_one(product("B", 250), 4).unwrap();
        cart.add_one(product("C", 10), 1).unwrap();
        cart.toggle_selected(&id("B")).unwrap();

        let removed = cart.clear_selected().unwrap();
        let removed: Vec<_> = removed.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(removed, vec!["A", "C"]);

        assert_eq!(cart.count(), 1);
        let survivor = cart.line(&id("B")).unwrap();
        assert_eq!(survivor.quantity, 4);
        assert_eq!(survivor.unit_price, Money::new(250));
    }

    #[test]
    fn test_remove_products_ignores_selection() {
        let cache = cache();
        let mut cart = CartStore::open(cache.clone(), "cart");
        cart.add_one(product("A", 100), 1).unwrap();
        cart.add_one(product("B", 250), 1).unwrap();
        cart.toggle_selected(&id("A")).unwrap();

        let removed = cart.remove_products(&[id("A"), id("Z")]).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].product_id, id("A"));

        let reopened = CartStore::open(cache, "cart");
        assert_eq!(reopened.count(), 1);
        assert!(reopened.line(&id("B")).unwrap().selected);
    }

    #[test]
    fn test_reopen_restores_identical_lines() {
        let cache = cache();
        let mut cart = CartStore::open(cache.clone(), "cart");
        cart.add_one(product("A", 100).with_attribute("variation", "Red"), 2)
            .unwrap();
        cart.add_one(product("B", 250), 1).unwrap();
        cart.toggle_selected(&id("A")).unwrap();

        let reopened = CartStore::open(cache, "cart");
        assert_eq!(reopened.lines(), cart.lines());
    }

    #[test]
    fn test_malformed_snapshot_opens_empty() {
        let cache = cache();
        cache.store().set("cart", b"{\"oops\":").unwrap();

        let mut cart = CartStore::open(cache.clone(), "cart");
        assert!(cart.is_empty());

        // The next mutation overwrites the bad blob.
        cart.add_one(product("A", 100), 1).unwrap();
        assert_eq!(CartStore::open(cache, "cart").count(), 1);
    }

    #[test]
    fn test_snapshot_violating_invariants_opens_empty() {
        let cache = cache();
        let line = product("A", 100).into_line(1);
        cache.set("cart", &vec![line.clone(), line]).unwrap();
        assert!(CartStore::open(cache.clone(), "cart").is_empty());

        let mut zero = product("B", 100).into_line(1);
        zero.quantity = 0;
        cache.set("cart", &vec![zero]).unwrap();
        assert!(CartStore::open(cache, "cart").is_empty());
    }
}
