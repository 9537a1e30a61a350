//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, Result};
use crate::money::Currency;
use crate::retry::RetrySettings;

/// Engine configuration, read from TOML (or JSON by extension).
///
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub currency: Currency,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub retry: RetrySettings,
    pub orders: OrdersConfig,
}

/// Where state lives in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the file-backed store.
    pub data_dir: PathBuf,
    pub cart_key: String,
    pub orders_key: String,
    /// Transient checkout draft.
    pub draft_key: String,
    /// Used only by the local order backend.
    pub backend_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".turbo-cart"),
            cart_key: "cart".to_string(),
            orders_key: "orders".to_string(),
            draft_key: "orderDetails".to_string(),
            backend_key: "backend:orders".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub page_size: i64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { page_size: 12 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    pub id_prefix: String,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            id_prefix: "ORD".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from a file. `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CommerceError::Config(format!("{}: {}", path.display(), e)))?;

        let config: Self = if path.extension().map_or(false, |ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| CommerceError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            toml::from_str(&content)
                .map_err(|e| CommerceError::Config(format!("{}: {}", path.display(), e)))?
        };
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| CommerceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CommerceError::Config(e.to_string()))
    }

    /// Reject page sizes below 1 and empty or shared storage keys.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.page_size < 1 {
            return Err(CommerceError::Config(format!(
                "catalog.page_size must be at least 1, got {}",
                self.catalog.page_size
            )));
        }
        let keys = [
            &self.storage.cart_key,
            &self.storage.orders_key,
            &self.storage.draft_key,
            &self.storage.backend_key,
        ];
        if keys.iter().any(|k| k.is_empty()) {
            return Err(CommerceError::Config("storage keys must not be empty".into()));
        }
        for (i, a) in keys.iter().enumerate() {
            if keys[i + 1..].contains(a) {
                return Err(CommerceError::Config(format!("storage key '{}' used twice", a)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.storage.cart_key, "cart");
        assert_eq!(config.storage.draft_key, "orderDetails");
        assert_eq!(config.catalog.page_size, 12);
        assert_eq!(config.currency, Currency::PHP);
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml(
            r#"
            currency = "USD"

            [catalog]
            page_size = 24

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.currency, Currency::USD);
        assert_eq!(config.catalog.page_size, 24);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_ms, 50);
        assert_eq!(config.orders.id_prefix, "ORD");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(EngineConfig::from_toml("[catalog]\npage_size = 0").is_err());
        assert!(EngineConfig::from_toml("[storage]\norders_key = \"cart\"").is_err());
        assert!(EngineConfig::from_toml("currency = 7").is_err());
    }

    #[test]
    fn test_toml_roundtrip_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turbo-cart.toml");
        let mut config = EngineConfig::default();
        config.orders.id_prefix = "SHOP".into();
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap(), config);
        assert!(EngineConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
