//! CLI command implementations.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod init;
pub mod orders;

use clap::{Args, Subcommand};

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the cart command.
#[derive(Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub command: Option<CartCommand>,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Add a product, merging into an existing line.
    Add {
        /// Product ID.
        id: String,

        /// Display name.
        #[arg(short, long)]
        name: String,

        /// Unit price, e.g. 1299.50.
        #[arg(short, long)]
        price: String,

        /// Quantity to add.
        #[arg(short, long, default_value = "1")]
        qty: i64,

        /// Line attribute as name=value (repeatable).
        #[arg(long = "attr")]
        attributes: Vec<String>,
    },
    /// Remove a line.
    Remove {
        /// Product ID.
        id: String,
    },
    /// Change a line's quantity by a delta (floored at 1).
    Qty {
        /// Product ID.
        id: String,

        /// Signed change, e.g. 2 or -1.
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Flip a line's selection.
    Toggle {
        /// Product ID.
        id: String,
    },
    /// Select every line.
    SelectAll {
        /// Deselect every line instead.
        #[arg(long)]
        none: bool,
    },
    /// Show the cart.
    Show,
    /// Remove every selected line.
    ClearSelected,
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Delivery method: pickup or delivery.
    #[arg(short, long)]
    pub delivery: Option<String>,

    /// Note for the store.
    #[arg(short, long)]
    pub note: Option<String>,

    /// Payment method: cod, gcash or card.
    #[arg(short, long, default_value = "cod")]
    pub payment: String,

    /// Save the draft and stop before payment.
    #[arg(long, conflicts_with_all = ["resume", "discard"])]
    pub draft_only: bool,

    /// Pay for the saved draft instead of starting a new one.
    #[arg(long, conflicts_with = "discard")]
    pub resume: bool,

    /// Drop the saved draft.
    #[arg(long)]
    pub discard: bool,
}

/// Arguments for the orders command.
#[derive(Args)]
pub struct OrdersArgs {
    #[command(subcommand)]
    pub command: Option<OrdersCommand>,
}

#[derive(Subcommand)]
pub enum OrdersCommand {
    /// List orders, newest first.
    List {
        /// Only orders in this status (e.g. "To Ship").
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show one order.
    Show {
        /// Order ID.
        id: String,
    },
    /// Cancel an order.
    Cancel {
        /// Order ID.
        id: String,

        /// Why the order is cancelled.
        #[arg(short, long)]
        reason: String,
    },
    /// Confirm a shipped order arrived.
    Receive {
        /// Order ID.
        id: String,
    },
    /// Hand a to-ship order to the courier.
    Dispatch {
        /// Order ID.
        id: String,
    },
    /// Put an order's lines back into the cart.
    BuyAgain {
        /// Order ID.
        id: String,
    },
    /// Replace the local order list with the backend's.
    Refresh,
}

/// Arguments for the catalog command.
#[derive(Args)]
pub struct CatalogArgs {
    /// JSON file holding an array of products.
    #[arg(short, long)]
    pub file: String,

    /// Category filter.
    #[arg(long)]
    pub category: Option<String>,

    /// Brand filter (repeatable).
    #[arg(short, long)]
    pub brand: Vec<String>,

    /// Minimum price.
    #[arg(long)]
    pub min: Option<String>,

    /// Maximum price.
    #[arg(long)]
    pub max: Option<String>,

    /// Minimum rating (1-5).
    #[arg(short, long)]
    pub rating: Option<u8>,

    /// Page to show.
    #[arg(short, long, default_value = "1")]
    pub page: i64,

    /// Add this product from the catalog to the cart.
    #[arg(long)]
    pub add: Option<String>,
}
