//! Cart commands.

use anyhow::{anyhow, bail, Context as _, Result};
use serde::Serialize;
use turbo_cart::cart::{AddOutcome, CartProduct, CartStore};
use turbo_cart::{Money, ProductId};

use super::{CartArgs, CartCommand};
use crate::context::Context;
use crate::output::checkbox;

/// Run the cart command.
pub async fn run(args: CartArgs, ctx: &Context) -> Result<()> {
    let mut shop = ctx.storefront()?;
    let cart = shop.cart_mut();

    match args.command.unwrap_or(CartCommand::Show) {
        CartCommand::Add {
            id,
            name,
            price,
            qty,
            attributes,
        } => {
            let price: Money = price.parse().context("Invalid price")?;
            if price.is_negative() {
                bail!("Price must not be negative");
            }
            let mut product = CartProduct::new(id.as_str(), name, price);
            for attr in &attributes {
                let (key, value) = parse_attribute(attr)?;
                product = product.with_attribute(key, value);
            }
            match cart.add_one(product, qty)? {
                AddOutcome::Inserted => ctx.output.success(&format!("Added {}", id)),
                AddOutcome::Merged => ctx.output.success(&format!("Updated quantity of {}", id)),
                AddOutcome::MergedWithConflictingAttributes => ctx.output.warn(&format!(
                    "{} is already in the cart with different options; kept the existing ones",
                    id
                )),
            }
        }
        CartCommand::Remove { id } => {
            if !cart.remove(&ProductId::new(id.as_str()))? {
                bail!("{} is not in the cart", id);
            }
            ctx.output.success(&format!("Removed {}", id));
        }
        CartCommand::Qty { id, delta } => {
            let quantity = cart
                .set_quantity(&ProductId::new(id.as_str()), delta)?
                .ok_or_else(|| anyhow!("{} is not in the cart", id))?;
            ctx.output.success(&format!("{} quantity is now {}", id, quantity));
        }
        CartCommand::Toggle { id } => {
            let selected = cart
                .toggle_selected(&ProductId::new(id.as_str()))?
                .ok_or_else(|| anyhow!("{} is not in the cart", id))?;
            let state = if selected { "selected" } else { "deselected" };
            ctx.output.success(&format!("{} {}", id, state));
        }
        CartCommand::SelectAll { none } => {
            cart.set_all_selected(!none)?;
            ctx.output.success(if none { "Deselected all lines" } else { "Selected all lines" });
        }
        CartCommand::ClearSelected => {
            let removed = cart.clear_selected()?;
            ctx.output.success(&format!("Removed {} line(s)", removed.len()));
        }
        CartCommand::Show => {}
    }

    show(shop.cart(), ctx);
    Ok(())
}

/// Split `name=value`.
fn parse_attribute(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| anyhow!("Attribute must look like name=value, got '{}'", raw))
}

#[derive(Serialize)]
struct CartView<'a> {
    lines: &'a [turbo_cart::cart::CartLine],
    count: usize,
    selected_count: usize,
    total: Money,
    selected_total: Money,
}

fn show(cart: &CartStore, ctx: &Context) {
    if ctx.output.is_json() {
        ctx.output.json(&CartView {
            lines: cart.lines(),
            count: cart.count(),
            selected_count: cart.selected_count(),
            total: cart.total(),
            selected_total: cart.selected_total(),
        });
        return;
    }

    ctx.output.header("Cart");
    if cart.is_empty() {
        ctx.output.info("Your cart is empty.");
        return;
    }

    ctx.output
        .table_row(&["", "PRODUCT", "NAME", "QTY", "PRICE", "TOTAL"], &[3, 14, 28, 5, 12, 12]);
    for line in cart.lines() {
        let mut name = line.name.clone();
        if !line.attributes.is_empty() {
            let attrs: Vec<String> = line
                .attributes
                .iter()
                .map(|a| format!("{}: {}", a.name, a.value))
                .collect();
            name = format!("{} ({})", name, attrs.join(", "));
        }
        ctx.output.table_row(
            &[
                &checkbox(line.selected),
                line.product_id.as_str(),
                &name,
                &line.quantity.to_string(),
                &ctx.money(line.unit_price),
                &ctx.money(line.line_total()),
            ],
            &[3, 14, 28, 5, 12, 12],
        );
    }

    ctx.output.kv("Lines", &format!("{} ({} selected)", cart.count(), cart.selected_count()));
    ctx.output.kv("Total", &ctx.money(cart.total()));
    ctx.output.kv("Selected total", &ctx.money(cart.selected_total()));
}
