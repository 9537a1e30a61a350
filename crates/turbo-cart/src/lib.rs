//! Cart and order lifecycle engine for TurboCommerce.
//!
//! - **Cart**: persisted cart lines with selection, quantity and total rules
//! - **Checkout**: drafts, address and payment checks, order creation
//! - **Orders**: the order repository and the status machine
//! - **Catalog**: filter composition and pagination over a catalog service
//!
//! All state lives in a [`turbo_cache::KvStore`]. Remote services sit behind
//! async traits ([`OrderBackend`](orders::OrderBackend),
//! [`IdentityProvider`](checkout::IdentityProvider),
//! [`PaymentGateway`](checkout::PaymentGateway),
//! [`CatalogService`](catalog::CatalogService)).
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_cart::prelude::*;
//!
//! let mut shop = Storefront::local(EngineConfig::default(), store, identity);
//!
//! shop.cart_mut().add_one(CartProduct::new("sku-1", "Keyboard", Money::new(249900)), 1)?;
//! let draft = shop.begin_checkout(Some(DeliveryMethod::Pickup), None)?;
//! let order = shop.proceed_to_payment(&draft, PaymentMethod::Cod).await?;
//!
//! assert_eq!(order.status(), OrderStatus::StorePickup);
//! assert!(shop.cart().is_empty());
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod orders;
pub mod retry;
mod storefront;

pub use error::{BackendError, CommerceError};
pub use ids::*;
pub use money::{Currency, Money};
pub use storefront::{Collaborators, Storefront};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{BackendError, CommerceError};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};
    pub use crate::{Collaborators, Storefront};

    // Cart
    pub use crate::cart::{AddOutcome, CartLine, CartProduct, CartStore, LineAttribute};

    // Checkout
    pub use crate::checkout::{
        Address, AlwaysApprove, CheckoutAssembler, DraftStore, IdentityProvider, OrderDraft,
        PaymentGateway, PaymentOutcome, StaticIdentity,
    };

    // Orders
    pub use crate::orders::{
        DeliveryMethod, LocalOrderBackend, Order, OrderBackend, OrderRepository, OrderStatus,
        PaymentMethod, StatusAction, SubStatus,
    };

    // Catalog
    pub use crate::catalog::{
        CatalogProduct, CatalogService, FilterComposer, FilterUpdate, InMemoryCatalog, Pagination,
    };

    pub use crate::config::EngineConfig;
    pub use crate::retry::RetryPolicy;
}
