//! Shopping cart: line items and the persisted cart store.

mod line;
mod store;

pub use line::{AddOutcome, CartLine, CartProduct, LineAttribute};
pub use store::CartStore;
