//! Starter config.

use anyhow::{bail, Result};

use super::InitArgs;
use crate::config::generate_default_config;
use crate::context::{Context, CONFIG_NAMES};

/// Run the init command.
pub async fn run(args: InitArgs, ctx: &Context) -> Result<()> {
    let path = ctx.cwd.join(CONFIG_NAMES[0]);
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    std::fs::write(&path, generate_default_config())?;
    ctx.output.success(&format!("Wrote {}", path.display()));
    ctx.output.info("Edit [profile] to set your token and address.");
    Ok(())
}
