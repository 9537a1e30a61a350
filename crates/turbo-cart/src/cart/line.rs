//! Cart line types.

use serde::{Deserialize, Serialize};

use crate::ids::ProductId;
use crate::money::Money;

/// A free-form attribute carried on a line (variation, size, spec string).
///
/// The engine never interprets these; they are copied verbatim into orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAttribute {
    pub name: String,
    pub value: String,
}

impl LineAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One distinct product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Line identity; at most one line per product.
    pub product_id: ProductId,
    /// Display name.
    pub name: String,
    /// Price of one unit.
    pub unit_price: Money,
    /// Always at least 1.
    pub quantity: i64,
    /// Whether the line takes part in the next checkout.
    pub selected: bool,
    #[serde(default)]
    pub attributes: Vec<LineAttribute>,
}

impl CartLine {
    /// `unit_price × quantity`.
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// A product as offered to the cart by the catalog or a past order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub attributes: Vec<LineAttribute>,
}

impl CartProduct {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            attributes: Vec::new(),
        }
    }

    /// Attach an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(LineAttribute::new(name, value));
        self
    }

    pub(crate) fn into_line(self, quantity: i64) -> CartLine {
        CartLine {
            product_id: self.id,
            name: self.name,
            unit_price: self.unit_price,
            quantity,
            selected: true,
            attributes: self.attributes,
        }
    }
}

/// What `add_one` did with the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Inserted,
    /// The quantity of an existing line was increased.
    Merged,
    /// Merged into an existing line whose attributes differ from the
    /// product's. The existing attributes were kept.
    MergedWithConflictingAttributes,
}
