//! Order commands.

use anyhow::{anyhow, Result};
use turbo_cart::orders::{Order, OrderStatus, StatusAction, CANCEL_REASONS};
use turbo_cart::{OrderId, Storefront};

use super::{OrdersArgs, OrdersCommand};
use crate::context::Context;
use crate::output::{format_timestamp, status_badge};

/// Run the orders command.
pub async fn run(args: OrdersArgs, ctx: &Context) -> Result<()> {
    let mut shop = ctx.storefront()?;

    match args.command.unwrap_or(OrdersCommand::List { status: None }) {
        OrdersCommand::List { status } => {
            let status = status
                .as_deref()
                .map(str::parse::<OrderStatus>)
                .transpose()
                .map_err(|e| anyhow!(e))?;
            list(&shop, status, ctx);
        }
        OrdersCommand::Show { id } => {
            let order = find(&shop, &id)?;
            show(&order, ctx);
        }
        OrdersCommand::Cancel { id, reason } => {
            if !CANCEL_REASONS.contains(&reason.as_str()) {
                ctx.output.debug(&format!("Custom reason (suggested: {})", CANCEL_REASONS.join(", ")));
            }
            update(&shop, &id, StatusAction::cancel(reason), ctx).await?;
        }
        OrdersCommand::Receive { id } => {
            update(&shop, &id, StatusAction::MarkReceived, ctx).await?;
        }
        OrdersCommand::Dispatch { id } => {
            update(&shop, &id, StatusAction::Dispatch, ctx).await?;
        }
        OrdersCommand::BuyAgain { id } => {
            let outcomes = shop.buy_again(&OrderId::new(id.as_str()))?;
            ctx.output
                .success(&format!("Added {} line(s) from {} to the cart", outcomes.len(), id));
        }
        OrdersCommand::Refresh => {
            let orders = shop.orders().refresh().await?;
            ctx.output.success(&format!("Synced {} order(s)", orders.len()));
        }
    }

    Ok(())
}

fn find(shop: &Storefront, id: &str) -> Result<Order> {
    shop.orders()
        .get(&OrderId::new(id))
        .ok_or_else(|| anyhow!("Order '{}' not found", id))
}

async fn update(shop: &Storefront, id: &str, action: StatusAction, ctx: &Context) -> Result<()> {
    let order = shop.update_status(&OrderId::new(id), action).await?;
    if ctx.output.is_json() {
        ctx.output.json(&order);
        return Ok(());
    }
    ctx.output.success(&format!(
        "Order {} is now {} ({})",
        order.order_id(),
        order.status(),
        order.sub_status()
    ));
    Ok(())
}

fn list(shop: &Storefront, status: Option<OrderStatus>, ctx: &Context) {
    let orders = match status {
        Some(status) => shop.orders().list_by_status(status),
        None => shop.orders().list(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&orders);
        return;
    }

    ctx.output.header("Orders");
    if orders.is_empty() {
        ctx.output.info("No orders yet.");
        return;
    }

    ctx.output
        .table_row(&["ORDER", "DATE", "STATUS", "ITEMS", "TOTAL"], &[20, 25, 14, 6, 12]);
    for order in &orders {
        ctx.output.table_row(
            &[
                order.order_id().as_str(),
                &format_timestamp(order.order_date()),
                &status_badge(order.status()),
                &order.unit_count().to_string(),
                &ctx.money(order.total()),
            ],
            &[20, 25, 14, 6, 12],
        );
    }
    ctx.output.info("");
    ctx.output.kv("Total spent", &ctx.money(shop.orders().total_spent()));
}

fn show(order: &Order, ctx: &Context) {
    if ctx.output.is_json() {
        ctx.output.json(order);
        return;
    }

    ctx.output.header(&format!("Order {}", order.order_id()));
    ctx.output.kv("Placed", &format_timestamp(order.order_date()));
    ctx.output.kv("Status", &format!("{} ({})", status_badge(order.status()), order.sub_status()));
    if let Some(reason) = order.cancel_reason() {
        ctx.output.kv("Cancel reason", reason);
    }
    if let Some(updated) = order.updated_at() {
        ctx.output.kv("Updated", &format_timestamp(updated));
    }
    ctx.output.kv("Delivery", order.delivery_details().method.display_name());
    ctx.output.kv("Ship to", &order.delivery_details().address);
    ctx.output.kv("Bill to", &order.delivery_details().billing);
    ctx.output.kv("Payment", order.payment_details().method.display_name());
    if let Some(note) = order.note() {
        ctx.output.kv("Note", note);
    }

    for line in order.items() {
        ctx.output.list_item(&format!(
            "{} x{}  {}",
            line.name,
            line.quantity,
            ctx.money(line.line_total)
        ));
    }
    ctx.output.kv("Total", &ctx.money(order.total()));

    let actions: Vec<&str> = order
        .status()
        .available_actions()
        .iter()
        .map(|a| a.label())
        .collect();
    ctx.output.kv("Actions", &actions.join(", "));
}
