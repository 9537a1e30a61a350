//! Filter composition for catalog queries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogProduct, CatalogService, Pagination, SearchResults};
use crate::error::Result;
use crate::money::Money;
use crate::retry::RetryPolicy;

/// Current catalog facets.
///
/// Price bounds are kept ordered (`min_price <= max_price` when both are
/// set). Brands are OR-ed together and scoped to the category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub brands: BTreeSet<String>,
    /// "This rating and up".
    pub rating: Option<u8>,
    pub category: Option<String>,
}

impl FilterSpec {
    /// Whether `product` passes every facet. Price bounds are inclusive.
    pub fn matches(&self, product: &CatalogProduct) -> bool {
        let price_ok = self.min_price.map_or(true, |min| product.price >= min)
            && self.max_price.map_or(true, |max| product.price <= max);
        let brand_ok = self.brands.is_empty()
            || self
                .brands
                .iter()
                .any(|b| b.eq_ignore_ascii_case(&product.brand));
        let rating_ok = self
            .rating
            .map_or(true, |floor| product.rating >= f32::from(floor));
        let category_ok = self
            .category
            .as_ref()
            .map_or(true, |c| c.eq_ignore_ascii_case(&product.category));
        price_ok && brand_ok && rating_ok && category_ok
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterSpec::default()
    }
}

/// A partial update. Unset fields leave the facet alone; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterUpdate {
    min_price: Option<Option<Money>>,
    max_price: Option<Option<Money>>,
    brands: Option<BTreeSet<String>>,
    rating: Option<Option<u8>>,
    category: Option<Option<String>>,
}

impl FilterUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_price(mut self, min: Option<Money>) -> Self {
        self.min_price = Some(min);
        self
    }

    pub fn max_price(mut self, max: Option<Money>) -> Self {
        self.max_price = Some(max);
        self
    }

    /// Replace the brand set.
    pub fn brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.brands = Some(brands.into_iter().map(Into::into).collect());
        self
    }

    /// Rating floor, capped at 5.
    pub fn rating(mut self, rating: Option<u8>) -> Self {
        self.rating = Some(rating.map(|r| r.min(5)));
        self
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = Some(category.filter(|c| !c.trim().is_empty()));
        self
    }
}

/// Canonical query handed to the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub filters: FilterSpec,
    /// 1-indexed.
    pub page: i64,
    pub page_size: i64,
}

impl CatalogQuery {
    /// Query-string parameters understood by the catalog service.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let f = &self.filters;
        let mut params = vec![("page", self.page.to_string())];
        if let Some(category) = &f.category {
            params.push(("category__name", category.clone()));
        }
        if let Some(min) = f.min_price {
            params.push(("min_price", min.to_string()));
        }
        if let Some(max) = f.max_price {
            params.push(("max_price", max.to_string()));
        }
        if !f.brands.is_empty() {
            let brands: Vec<&str> = f.brands.iter().map(String::as_str).collect();
            params.push(("brand_names", brands.join(",")));
        }
        if let Some(rating) = f.rating {
            params.push(("rating__gte", rating.to_string()));
        }
        params
    }

    /// Parameters joined as a query string (values are not percent-encoded).
    pub fn to_query_string(&self) -> String {
        self.to_params()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Holds the shopper's current facets and page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterComposer {
    spec: FilterSpec,
    page: i64,
    page_size: i64,
}

impl FilterComposer {
    pub fn new(page_size: i64) -> Self {
        Self {
            spec: FilterSpec::default(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    /// Merge `update` into the current facets.
    ///
    /// A category change clears the brand set, including brands sent in the
    /// same update. Any change sends the shopper back to page 1.
    pub fn apply(&mut self, update: FilterUpdate) -> &FilterSpec {
        let before = self.spec.clone();

        if let Some(min) = update.min_price {
            self.spec.min_price = min;
        }
        if let Some(max) = update.max_price {
            self.spec.max_price = max;
        }
        if let Some(brands) = update.brands {
            self.spec.brands = brands;
        }
        if let Some(rating) = update.rating {
            self.spec.rating = rating;
        }
        if let Some(category) = update.category {
            if category != self.spec.category {
                self.spec.category = category;
                self.spec.brands.clear();
            }
        }

        if let (Some(min), Some(max)) = (self.spec.min_price, self.spec.max_price) {
            if min > max {
                self.spec.min_price = Some(max);
                self.spec.max_price = Some(min);
            }
        }

        if self.spec != before {
            self.page = 1;
            tracing::debug!(filters = ?self.spec, "catalog filters changed");
        }
        &self.spec
    }

    /// Add the brand if absent, remove it if present.
    pub fn toggle_brand(&mut self, brand: impl Into<String>) -> &FilterSpec {
        let brand = brand.into();
        let mut brands = self.spec.brands.clone();
        if !brands.remove(&brand) {
            brands.insert(brand);
        }
        self.apply(FilterUpdate::new().brands(brands))
    }

    /// Move to `page` (at least 1). Out-of-range pages are clamped on fetch.
    pub fn set_page(&mut self, page: i64) {
        self.page = page.max(1);
    }

    /// Drop every facet and return to page 1.
    pub fn reset(&mut self) {
        self.spec = FilterSpec::default();
        self.page = 1;
    }

    pub fn query(&self) -> CatalogQuery {
        CatalogQuery {
            filters: self.spec.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }

    /// Run the current query, clamping a page past the end to the last page.
    pub async fn fetch(
        &mut self,
        catalog: &dyn CatalogService,
        retry: &RetryPolicy,
    ) -> Result<SearchResults<CatalogProduct>> {
        let requested = self.page;
        let query = self.query();
        let mut page = retry.run("catalog search", || catalog.search(&query)).await?;
        let mut pagination = Pagination::new(requested, page.page_size_or(self.page_size), page.count);

        if pagination.page != requested {
            tracing::debug!(requested, last = pagination.page, "page out of range; clamping");
            self.page = pagination.page;
            let query = self.query();
            page = retry.run("catalog search", || catalog.search(&query)).await?;
            pagination = Pagination::new(self.page, page.page_size_or(self.page_size), page.count);
        }

        Ok(SearchResults::new(page.items, pagination, requested))
    }
}

impl Default for FilterComposer {
    fn default() -> Self {
        Self::new(12)
    }
}
