//! Cart CLI - shop against a local TurboCommerce cart engine.
//!
//! Commands:
//! - `cart init` - Write a starter config file
//! - `cart cart` - Add, remove and select cart lines
//! - `cart checkout` - Turn the selected lines into an order
//! - `cart orders` - List, inspect and update orders
//! - `cart catalog` - Browse a product file with filters and paging

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CartArgs, CatalogArgs, CheckoutArgs, InitArgs, OrdersArgs};

/// Cart CLI - manage a cart and its orders from the terminal
#[derive(Parser)]
#[command(name = "cart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter turbo-cart.toml
    Init(InitArgs),

    /// Manage cart lines
    Cart(CartArgs),

    /// Check out the selected cart lines
    Checkout(CheckoutArgs),

    /// Inspect and update orders
    Orders(OrdersArgs),

    /// Browse a product catalog
    Catalog(CatalogArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    let result = match cli.command {
        Commands::Init(args) => commands::init::run(args, &ctx).await,
        Commands::Cart(args) => commands::cart::run(args, &ctx).await,
        Commands::Checkout(args) => commands::checkout::run(args, &ctx).await,
        Commands::Orders(args) => commands::orders::run(args, &ctx).await,
        Commands::Catalog(args) => commands::catalog::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
