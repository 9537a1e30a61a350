//! The order status machine.
//!
//! [`transition`] is the only code path that changes an order's status,
//! sub-status or cancel reason.
//!
//! | From                               | Action          | To         |
//! |------------------------------------|-----------------|------------|
//! | To Ship, Store Pick-up, To Receive | cancel(reason)  | Cancelled  |
//! | To Ship                            | dispatch        | To Receive |
//! | To Receive                         | mark received   | Completed  |
//!
//! Completed and Cancelled are terminal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, Result};
use crate::orders::{DeliveryMethod, Order, StatusUpdateRequest};

/// Reasons offered to a shopper cancelling an order.
pub const CANCEL_REASONS: [&str; 6] = [
    "I ordered by mistake",
    "Item won't arrive on time",
    "Found a better price elsewhere",
    "Change of mind",
    "Ordered wrong item",
    "Others",
];

/// Primary order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "To Ship")]
    ToShip,
    #[serde(rename = "Store Pick-up")]
    StorePickup,
    #[serde(rename = "To Receive")]
    ToReceive,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::ToShip,
        OrderStatus::StorePickup,
        OrderStatus::ToReceive,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::ToShip => "To Ship",
            OrderStatus::StorePickup => "Store Pick-up",
            OrderStatus::ToReceive => "To Receive",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Status and sub-status of a freshly created order.
    pub fn initial_for(method: DeliveryMethod) -> (OrderStatus, SubStatus) {
        match method {
            DeliveryMethod::Pickup => (OrderStatus::StorePickup, SubStatus::AwaitingArrival),
            DeliveryMethod::Delivery => (OrderStatus::ToShip, SubStatus::Processing),
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Check if order can be cancelled.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether "buy again" is offered.
    pub fn can_reorder(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::StorePickup
        )
    }

    /// Actions a shopper may take on an order in this status.
    pub fn available_actions(&self) -> &'static [OrderAction] {
        match self {
            OrderStatus::ToShip => &[OrderAction::Cancel],
            OrderStatus::StorePickup => &[OrderAction::Cancel, OrderAction::BuyAgain],
            OrderStatus::ToReceive => &[OrderAction::MarkReceived, OrderAction::Cancel],
            OrderStatus::Completed | OrderStatus::Cancelled => &[OrderAction::BuyAgain],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    /// Accepts display names ("Store Pick-up") and slugs ("store-pickup").
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "toship" => Ok(OrderStatus::ToShip),
            "storepickup" | "pickup" => Ok(OrderStatus::StorePickup),
            "toreceive" => Ok(OrderStatus::ToReceive),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!("unknown order status '{}'", s)),
        }
    }
}

/// Human-facing refinement of the primary status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubStatus {
    #[serde(rename = "Waiting for your arrival")]
    AwaitingArrival,
    #[serde(rename = "Processing")]
    Processing,
    #[serde(rename = "In transit")]
    InTransit,
    #[serde(rename = "Cancelled by you")]
    CancelledByYou,
    #[serde(rename = "Order Completed")]
    OrderCompleted,
}

impl SubStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubStatus::AwaitingArrival => "Waiting for your arrival",
            SubStatus::Processing => "Processing",
            SubStatus::InTransit => "In transit",
            SubStatus::CancelledByYou => "Cancelled by you",
            SubStatus::OrderCompleted => "Order Completed",
        }
    }
}

impl fmt::Display for SubStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shopper-facing controls for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderAction {
    Cancel,
    MarkReceived,
    BuyAgain,
}

impl OrderAction {
    pub fn label(&self) -> &'static str {
        match self {
            OrderAction::Cancel => "Cancel Order",
            OrderAction::MarkReceived => "Order Received",
            OrderAction::BuyAgain => "Buy Again",
        }
    }
}

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusAction {
    /// Shopper cancels; the reason must be non-blank.
    Cancel { reason: String },
    /// Shopper confirms receipt of a shipped order.
    MarkReceived,
    /// Store hands the parcel to the courier.
    Dispatch,
}

impl StatusAction {
    pub fn cancel(reason: impl Into<String>) -> Self {
        StatusAction::Cancel {
            reason: reason.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatusAction::Cancel { .. } => "cancel",
            StatusAction::MarkReceived => "mark received",
            StatusAction::Dispatch => "dispatch",
        }
    }

    /// Status an order lands in when the action succeeds.
    pub fn target(&self) -> OrderStatus {
        match self {
            StatusAction::Cancel { .. } => OrderStatus::Cancelled,
            StatusAction::MarkReceived => OrderStatus::Completed,
            StatusAction::Dispatch => OrderStatus::ToReceive,
        }
    }

    /// The payload telling the backend about this action.
    pub fn to_request(&self) -> StatusUpdateRequest {
        let reason = match self {
            StatusAction::Cancel { reason } => Some(reason.trim().to_string()),
            _ => None,
        };
        StatusUpdateRequest {
            status: self.target(),
            reason,
        }
    }

    /// Recover the action a status-update payload asks for.
    pub fn from_request(request: &StatusUpdateRequest) -> Option<Self> {
        match request.status {
            OrderStatus::Cancelled => Some(StatusAction::Cancel {
                reason: request.reason.clone().unwrap_or_default(),
            }),
            OrderStatus::Completed => Some(StatusAction::MarkReceived),
            OrderStatus::ToReceive => Some(StatusAction::Dispatch),
            OrderStatus::ToShip | OrderStatus::StorePickup => None,
        }
    }
}

/// Apply `action` to `order`, returning the updated copy.
///
/// Fails with [`CommerceError::IllegalTransition`] from terminal states, for
/// actions the current status does not allow, and for a blank cancel reason.
/// On failure `order` is untouched.
pub fn transition(order: &Order, action: &StatusAction, at: DateTime<Utc>) -> Result<Order> {
    use OrderStatus::*;

    let from = order.status();
    let illegal = |what: &str| CommerceError::IllegalTransition {
        from: from.as_str().to_string(),
        action: what.to_string(),
    };

    let (status, sub_status, cancel_reason) = match (from, action) {
        (ToShip | StorePickup | ToReceive, StatusAction::Cancel { reason }) => {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(illegal("cancel without a reason"));
            }
            (Cancelled, SubStatus::CancelledByYou, Some(reason.to_string()))
        }
        (ToReceive, StatusAction::MarkReceived) => (
            Completed,
            SubStatus::OrderCompleted,
            order.cancel_reason().map(str::to_string),
        ),
        (ToShip, StatusAction::Dispatch) => (ToReceive, SubStatus::InTransit, None),
        _ => return Err(illegal(action.name())),
    };

    let mut next = order.clone();
    next.apply_status(status, sub_status, cancel_reason, at);
    tracing::debug!(
        order_id = %order.order_id(),
        from = %from,
        to = %status,
        "status transition"
    );
    Ok(next)
}
