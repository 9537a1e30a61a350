//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use turbo_cache::FileStore;
use turbo_cart::{Currency, Money, Storefront};

use crate::config::CliConfig;
use crate::output::Output;

/// Config file names searched for, nearest directory first.
pub const CONFIG_NAMES: [&str; 3] = ["turbo-cart.toml", ".turbo-cart.toml", "turbo-cart.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config = match config_path {
            Some(path) => CliConfig::load(path)?,
            None => Self::find_config(&cwd).unwrap_or_default(),
        };

        Ok(Self { config, output, cwd })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<CliConfig> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    match CliConfig::load(config_path.to_str()?) {
                        Ok(config) => return Some(config),
                        Err(e) => tracing::warn!(path = %config_path.display(), error = %e, "skipping config"),
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Directory holding the file-backed store.
    pub fn data_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.engine.storage.data_dir)
    }

    /// Open the shopper session over the file-backed store.
    pub fn storefront(&self) -> Result<Storefront> {
        let dir = self.data_dir();
        let store = FileStore::open(&dir)
            .with_context(|| format!("Failed to open data directory: {}", dir.display()))?;
        self.output.debug(&format!("Using data directory {}", dir.display()));

        Ok(Storefront::local(
            self.config.engine.clone(),
            Arc::new(store),
            Arc::new(self.config.profile.identity()),
        ))
    }

    pub fn currency(&self) -> Currency {
        self.config.engine.currency
    }

    /// Format an amount in the configured currency.
    pub fn money(&self, amount: Money) -> String {
        amount.display(self.currency())
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}
