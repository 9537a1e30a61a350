//! Catalog service boundary and an in-memory implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cart::CartProduct;
use crate::catalog::CatalogQuery;
use crate::error::BackendError;
use crate::ids::ProductId;
use crate::money::Money;

/// A product as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    pub price: Money,
    #[serde(default)]
    pub rating: f32,
}

impl CatalogProduct {
    /// The cart-facing view of this product.
    pub fn to_cart_product(&self) -> CartProduct {
        let mut product = CartProduct::new(self.id.clone(), self.name.clone(), self.price);
        if !self.brand.is_empty() {
            product = product.with_attribute("brand", self.brand.clone());
        }
        product
    }
}

/// One page as returned by the catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<CatalogProduct>,
    /// Matches across all pages.
    pub count: i64,
    /// Page size the service used; 0 if it didn't say.
    #[serde(default)]
    pub page_size: i64,
}

impl ProductPage {
    pub fn page_size_or(&self, fallback: i64) -> i64 {
        if self.page_size > 0 {
            self.page_size
        } else {
            fallback
        }
    }
}

/// Read-only product lookups.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn search(&self, query: &CatalogQuery) -> Result<ProductPage, BackendError>;
}

/// Catalog over a fixed product list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Vec<CatalogProduct>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<CatalogProduct>) -> Self {
        Self { products }
    }

    /// Parse a JSON array of products.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn products(&self) -> &[CatalogProduct] {
        &self.products
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn search(&self, query: &CatalogQuery) -> Result<ProductPage, BackendError> {
        let matching: Vec<&CatalogProduct> = self
            .products
            .iter()
            .filter(|p| query.filters.matches(p))
            .collect();
        let count = matching.len() as i64;

        // Out-of-range pages come back empty, like a remote service would.
        let page_size = query.page_size.max(1);
        let offset = (query.page.max(1) - 1).saturating_mul(page_size);
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(usize::try_from(page_size).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(ProductPage {
            items,
            count,
            page_size: query.page_size,
        })
    }
}
