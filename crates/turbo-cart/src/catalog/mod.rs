//! Catalog browsing: filter composition, pagination and the catalog service.

mod filter;
mod results;
mod service;

pub use filter::{CatalogQuery, FilterComposer, FilterSpec, FilterUpdate};
pub use results::{Pagination, SearchResults};
pub use service::{CatalogProduct, CatalogService, InMemoryCatalog, ProductPage};
