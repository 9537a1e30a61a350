//! Catalog browsing.

use anyhow::{anyhow, Context as _, Result};
use turbo_cart::catalog::{FilterUpdate, InMemoryCatalog};
use turbo_cart::Money;

use super::CatalogArgs;
use crate::context::Context;

/// Run the catalog command.
pub async fn run(args: CatalogArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.file);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
    let catalog = InMemoryCatalog::from_json(&content)
        .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;

    let mut shop = ctx.storefront()?;

    if let Some(id) = &args.add {
        let product = catalog
            .products()
            .iter()
            .find(|p| p.id.as_str() == id)
            .ok_or_else(|| anyhow!("Product '{}' is not in the catalog", id))?;
        shop.cart_mut().add_one(product.to_cart_product(), 1)?;
        ctx.output.success(&format!("Added {} to the cart", product.name));
        return Ok(());
    }

    let mut composer = shop.filter_composer();
    composer.apply(
        FilterUpdate::new()
            .category(args.category.clone())
            .min_price(parse_price(args.min.as_deref())?)
            .max_price(parse_price(args.max.as_deref())?)
            .rating(args.rating),
    );
    // Brands are scoped to the category, so they go in after it.
    if !args.brand.is_empty() {
        composer.apply(FilterUpdate::new().brands(args.brand.iter().cloned()));
    }
    composer.set_page(args.page);
    ctx.output.debug(&format!("Query: {}", composer.query().to_query_string()));

    let results = composer.fetch(&catalog, shop.retry_policy()).await?;

    if ctx.output.is_json() {
        ctx.output.json(&results);
        return Ok(());
    }

    ctx.output.header("Catalog");
    if results.was_clamped() {
        ctx.output.warn(&format!(
            "Page {} is past the end; showing page {}",
            results.requested_page, results.pagination.page
        ));
    }
    if results.is_empty() {
        ctx.output.info("No products match these filters.");
        return Ok(());
    }

    ctx.output
        .table_row(&["ID", "NAME", "BRAND", "RATING", "PRICE"], &[12, 28, 14, 6, 12]);
    for product in &results.items {
        ctx.output.table_row(
            &[
                product.id.as_str(),
                &product.name,
                &product.brand,
                &format!("{:.1}", product.rating),
                &ctx.money(product.price),
            ],
            &[12, 28, 14, 6, 12],
        );
    }

    let p = &results.pagination;
    ctx.output.info("");
    ctx.output.info(&format!(
        "Showing {}-{} of {} (page {} of {})",
        p.start_item(),
        p.end_item(),
        p.total,
        p.page,
        p.total_pages
    ));
    Ok(())
}

fn parse_price(raw: Option<&str>) -> Result<Option<Money>> {
    raw.map(|s| s.parse::<Money>().with_context(|| format!("Invalid price '{}'", s)))
        .transpose()
}
