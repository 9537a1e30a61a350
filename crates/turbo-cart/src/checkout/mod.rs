//! Checkout: turning selected cart lines into an order.

mod address;
mod assembler;
mod draft;
mod identity;
mod payment;

pub use address::Address;
pub use assembler::CheckoutAssembler;
pub use draft::{DraftStore, OrderDraft};
pub use identity::{IdentityProvider, StaticIdentity};
pub use payment::{AlwaysApprove, PaymentGateway, PaymentOutcome};
