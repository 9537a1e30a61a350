//! Checkout command.

use anyhow::{anyhow, Result};
use turbo_cart::checkout::OrderDraft;
use turbo_cart::orders::{DeliveryMethod, PaymentMethod};

use super::CheckoutArgs;
use crate::context::Context;
use crate::output::format_timestamp;

/// Run the checkout command.
pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let mut shop = ctx.storefront()?;

    if args.discard {
        shop.checkout().discard_draft()?;
        ctx.output.success("Discarded the saved draft");
        return Ok(());
    }

    let draft = if args.resume {
        shop.checkout()
            .resume_draft()
            .ok_or_else(|| anyhow!("No saved draft; run `cart checkout --delivery ...` first"))?
    } else {
        let delivery = args
            .delivery
            .as_deref()
            .map(str::parse::<DeliveryMethod>)
            .transpose()?;
        shop.begin_checkout(delivery, args.note.clone())?
    };
    show_draft(&draft, ctx);

    if args.draft_only {
        ctx.output.info("Draft saved. Run `cart checkout --resume` to pay.");
        return Ok(());
    }

    let payment: PaymentMethod = args.payment.parse().map_err(|e: String| anyhow!(e))?;
    ctx.output.debug(&format!("Paying with {}", payment.display_name()));

    let order = shop.proceed_to_payment(&draft, payment).await?;

    if ctx.output.is_json() {
        ctx.output.json(&order);
        return Ok(());
    }
    ctx.output.success(&format!("Order {} placed", order.order_id()));
    ctx.output.kv("Status", &format!("{} ({})", order.status(), order.sub_status()));
    ctx.output.kv("Date", &format_timestamp(order.order_date()));
    ctx.output.kv("Total", &ctx.money(order.total()));
    if let Some(note) = order.note() {
        ctx.output.kv("Note", note);
    }
    Ok(())
}

fn show_draft(draft: &OrderDraft, ctx: &Context) {
    ctx.output.header("Order summary");
    for line in draft.items() {
        ctx.output.list_item(&format!(
            "{} x{}  {}",
            line.name,
            line.quantity,
            ctx.money(line.line_total())
        ));
    }
    ctx.output.kv("Delivery", draft.delivery_method().display_name());
    if let Some(note) = draft.order_note() {
        ctx.output.kv("Note", note);
    }
    ctx.output.kv("Subtotal", &ctx.money(draft.subtotal()));
    ctx.output.kv("Discount", &ctx.money(draft.discount()));
    ctx.output.kv("Shipping", &ctx.money(draft.shipping_fee()));
    ctx.output.kv("Total", &ctx.money(draft.total()));
}
