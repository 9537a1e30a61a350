//! CLI configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use turbo_cart::checkout::{Address, StaticIdentity};
use turbo_cart::config::EngineConfig;

/// CLI configuration file: the engine settings plus the shopper profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Engine settings (`currency`, `[storage]`, `[catalog]`, `[retry]`, `[orders]`).
    #[serde(flatten)]
    pub engine: EngineConfig,

    /// Signed-in shopper.
    #[serde(default)]
    pub profile: ProfileConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))?
        };
        config
            .engine
            .validate()
            .with_context(|| format!("Invalid config: {}", path))?;
        Ok(config)
    }
}

/// The shopper's credential and addresses.
///
/// Without a token checkout stops at the credential check; without a complete
/// address it stops at the address check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<Address>,
}

impl ProfileConfig {
    pub fn identity(&self) -> StaticIdentity {
        let identity = StaticIdentity::new(self.token.clone(), self.address.clone());
        match &self.billing {
            Some(billing) => identity.with_billing(billing.clone()),
            None => identity,
        }
    }
}

/// Generate a starter turbo-cart.toml.
pub fn generate_default_config() -> String {
    r#"# TurboCommerce cart configuration

currency = "PHP"

[storage]
data_dir = ".turbo-cart"

[catalog]
page_size = 12

[retry]
max_attempts = 2
backoff_ms = 50
max_backoff_ms = 500

[orders]
id_prefix = "ORD"

[profile]
token = "dev-token"

[profile.address]
first_name = "Juan"
last_name = "Dela Cruz"
line = "1 Rizal Street"
city = "Manila"
province = "Metro Manila"
postal_code = "1000"
country = "Philippines"
"#
    .to_string()
}
