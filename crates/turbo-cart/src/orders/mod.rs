//! Orders: records, the status machine and the repository.

mod backend;
mod order;
mod repository;
mod status;

pub use backend::{LocalOrderBackend, OrderBackend};
pub use order::{
    DeliveryDetails, DeliveryMethod, Order, OrderCreateRequest, OrderLine, PaymentDetails,
    PaymentMethod, PaymentStatus, StatusUpdateRequest, PICKUP_NOTE,
};
pub use repository::{OrderRepository, StatusChange};
pub use status::{transition, OrderAction, OrderStatus, StatusAction, SubStatus, CANCEL_REASONS};
