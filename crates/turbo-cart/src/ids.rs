//! Newtype IDs for type-safe identifiers.
//!
//! Using newtypes prevents accidentally passing a product id where an order
//! id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Catalog product identifier; the identity of a cart line.
    ProductId
);
define_id!(
    /// Order identifier, `{prefix}-{millis}`.
    OrderId
);

/// Issues order ids that sort lexicographically by creation time.
///
/// The suffix is the creation instant in unix milliseconds, zero-padded to 13
/// digits. When two ids are requested within the same millisecond (or the
/// clock steps backwards) the generator issues `last + 1` instead, so ids
/// from one generator never repeat.
#[derive(Debug)]
pub struct OrderIdGenerator {
    prefix: String,
    last_millis: AtomicI64,
}

impl OrderIdGenerator {
    /// Create a generator with the given prefix (e.g. `ORD`).
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last_millis: AtomicI64::new(0),
        }
    }

    /// Issue the next id for an order created at `now`.
    pub fn next(&self, now: DateTime<Utc>) -> OrderId {
        let wanted = now.timestamp_millis();
        let mut last = self.last_millis.load(Ordering::SeqCst);
        loop {
            let issued = if wanted > last { wanted } else { last + 1 };
            match self.last_millis.compare_exchange(
                last,
                issued,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return OrderId(format!("{}-{:013}", self.prefix, issued)),
                Err(current) => last = current,
            }
        }
    }

    /// Make sure future ids sort after `id`, e.g. after loading a persisted list.
    pub fn observe(&self, id: &OrderId) {
        let suffix = id
            .as_str()
            .strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|millis| millis.parse::<i64>().ok());
        if let Some(millis) = suffix {
            self.last_millis.fetch_max(millis, Ordering::SeqCst);
        }
    }
}

impl Default for OrderIdGenerator {
    fn default() -> Self {
        Self::new("ORD")
    }
}
