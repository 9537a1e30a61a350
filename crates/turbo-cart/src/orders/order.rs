//! Order records and the payloads sent to the order backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{CartLine, LineAttribute};
use crate::error::CommerceError;
use crate::ids::{OrderId, ProductId};
use crate::money::Money;
use crate::orders::{OrderStatus, SubStatus};

/// Note attached to pickup orders when the shopper leaves none.
pub const PICKUP_NOTE: &str = "Please come to the store to pick up your order.";

/// How the shopper receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Pickup,
    Delivery,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Pickup => "pickup",
            DeliveryMethod::Delivery => "delivery",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeliveryMethod::Pickup => "Store Pickup",
            DeliveryMethod::Delivery => "Standard Delivery",
        }
    }
}

impl FromStr for DeliveryMethod {
    type Err = CommerceError;

    /// An empty choice is reported as a missing delivery method.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pickup" | "store pickup" => Ok(DeliveryMethod::Pickup),
            "delivery" | "standard delivery" => Ok(DeliveryMethod::Delivery),
            _ => Err(CommerceError::MissingDeliveryMethod),
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How the shopper pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Gcash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Gcash => "gcash",
            PaymentMethod::Card => "card",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "Cash on Delivery (COD)",
            PaymentMethod::Gcash => "GCash",
            PaymentMethod::Card => "Credit/Debit Card",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cod" => Ok(PaymentMethod::Cod),
            "gcash" => Ok(PaymentMethod::Gcash),
            "card" => Ok(PaymentMethod::Card),
            other => Err(format!("unknown payment method '{}'", other)),
        }
    }
}

/// Payment status recorded on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Paid,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub total: Money,
}

/// Delivery choice plus address snapshots taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub method: DeliveryMethod,
    /// Shipping address, one line.
    pub address: String,
    /// Billing address, one line.
    pub billing: String,
}

/// A frozen order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    #[serde(default)]
    pub attributes: Vec<LineAttribute>,
    pub line_total: Money,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            attributes: line.attributes.clone(),
            line_total: line.line_total(),
        }
    }
}

/// A persisted order.
///
/// Everything except the status fields is fixed at creation. Status fields
/// change only through [`transition`](crate::orders::transition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    order_id: OrderId,
    order_date: DateTime<Utc>,
    items: Vec<OrderLine>,
    payment_details: PaymentDetails,
    delivery_details: DeliveryDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    status: OrderStatus,
    sub_status: SubStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }

    pub fn payment_details(&self) -> &PaymentDetails {
        &self.payment_details
    }

    pub fn delivery_details(&self) -> &DeliveryDetails {
        &self.delivery_details
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn sub_status(&self) -> SubStatus {
        self.sub_status
    }

    /// Present only on cancelled orders.
    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// Time of the last status transition.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn total(&self) -> Money {
        self.payment_details.total
    }

    /// Total number of units across lines.
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    pub(crate) fn apply_status(
        &mut self,
        status: OrderStatus,
        sub_status: SubStatus,
        cancel_reason: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.status = status;
        self.sub_status = sub_status;
        self.cancel_reason = cancel_reason;
        self.updated_at = Some(at);
    }
}

/// Outbound order-creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateRequest {
    pub order_id: OrderId,
    pub order_date: DateTime<Utc>,
    pub items: Vec<OrderLine>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    pub status: OrderStatus,
    pub sub_status: SubStatus,
    pub shipping_address: String,
    pub billing_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<OrderCreateRequest> for Order {
    /// The record a backend stores for an accepted request.
    fn from(request: OrderCreateRequest) -> Self {
        Self {
            order_id: request.order_id,
            order_date: request.order_date,
            items: request.items,
            payment_details: PaymentDetails {
                method: request.payment_method,
                status: PaymentStatus::Paid,
                total: request.total,
            },
            delivery_details: DeliveryDetails {
                method: request.delivery_method,
                address: request.shipping_address,
                billing: request.billing_address,
            },
            note: request.note,
            status: request.status,
            sub_status: request.sub_status,
            cancel_reason: None,
            updated_at: None,
        }
    }
}

/// Outbound status-update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> OrderCreateRequest {
        OrderCreateRequest {
            order_id: OrderId::new("ORD-1700000000000"),
            order_date: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            items: vec![OrderLine {
                product_id: ProductId::new("A"),
                name: "Keyboard".into(),
                unit_price: Money::new(100),
                quantity: 2,
                attributes: vec![LineAttribute::new("switch", "brown")],
                line_total: Money::new(200),
            }],
            total: Money::new(200),
            payment_method: PaymentMethod::Gcash,
            delivery_method: DeliveryMethod::Delivery,
            status: OrderStatus::ToShip,
            sub_status: SubStatus::Processing,
            shipping_address: "1 Rizal St, Manila, NCR, 1000, Philippines".into(),
            billing_address: "1 Rizal St, Manila, NCR, 1000, Philippines".into(),
            note: None,
        }
    }

    #[test]
    fn test_order_from_request() {
        let order = Order::from(request());
        assert_eq!(order.total(), Money::new(200));
        assert_eq!(order.payment_details().status, PaymentStatus::Paid);
        assert_eq!(order.unit_count(), 2);
        assert!(order.cancel_reason().is_none());
        assert!(order.updated_at().is_none());
    }

    #[test]
    fn test_request_wire_names() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["orderId"], "ORD-1700000000000");
        assert_eq!(json["paymentMethod"], "gcash");
        assert_eq!(json["deliveryMethod"], "delivery");
        assert_eq!(json["status"], "To Ship");
        assert_eq!(json["subStatus"], "Processing");
        assert_eq!(json["items"][0]["lineTotal"], 200);
        assert!(json.get("note").is_none());
    }

    #[test]
    fn test_status_update_request_omits_missing_reason() {
        let json = serde_json::to_value(StatusUpdateRequest {
            status: OrderStatus::Completed,
            reason: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "status": "Completed" }));
    }

    #[test]
    fn test_delivery_method_parse() {
        assert_eq!("Pickup".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Pickup);
        assert_eq!(
            "standard delivery".parse::<DeliveryMethod>().unwrap(),
            DeliveryMethod::Delivery
        );
        assert!(matches!(
            "".parse::<DeliveryMethod>(),
            Err(CommerceError::MissingDeliveryMethod)
        ));
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("COD".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cod);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }
}
