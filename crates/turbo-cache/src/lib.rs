//! Type-safe Key-Value persistence layer for TurboCommerce.
//!
//! A [`KvStore`] holds named byte blobs. It is synchronous and does no
//! concurrency control of its own. [`Cache`] sits on top of any store and
//! adds JSON serialization.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use turbo_cache::{Cache, MemoryStore};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Cart {
//!     items: Vec<String>,
//! }
//!
//! let cache = Cache::new(Arc::new(MemoryStore::new()));
//!
//! let cart = Cart { items: vec!["sku-1".into()] };
//! cache.set("cart", &cart).unwrap();
//!
//! let loaded: Option<Cart> = cache.get("cart").unwrap();
//! assert_eq!(loaded, Some(cart));
//!
//! cache.delete("cart").unwrap();
//! assert!(!cache.exists("cart").unwrap());
//! ```

mod error;
mod kv;
mod store;

pub use error::CacheError;
pub use kv::Cache;
pub use store::{FileStore, KvStore, MemoryStore};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, FileStore, KvStore, MemoryStore};
}
