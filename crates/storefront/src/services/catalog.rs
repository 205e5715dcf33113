//! Product catalog: listings, categories, stats, search.
//!
//! Reads only. Every fetch degrades to an empty result on failure so a
//! backend outage shows an empty shelf instead of an error page.

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::api::{Backend, Category, Product, ProductStats};

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    /// Alphabetical by name.
    #[default]
    Name,
    /// Cheapest effective price first.
    PriceLow,
    /// Most expensive effective price first.
    PriceHigh,
    /// Highest rating first.
    Rating,
    /// Most recently created first.
    Newest,
}

impl SortKey {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Rating => "rating",
            Self::Newest => "newest",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::PriceLow => a.effective_price().cmp(&b.effective_price()),
            Self::PriceHigh => b.effective_price().cmp(&a.effective_price()),
            Self::Rating => b.rating.cmp(&a.rating),
            Self::Newest => b.created_at.cmp(&a.created_at),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "rating" => Ok(Self::Rating),
            "newest" => Ok(Self::Newest),
            _ => Err(format!(
                "unknown sort '{s}' (expected name, price-low, price-high, rating or newest)"
            )),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive match against name and description.
    pub search: Option<String>,
    /// Exact category name; `None` or `"all"` means every category.
    pub category: Option<String>,
    pub sort: SortKey,
}

impl ProductQuery {
    /// Whether any filter differs from the default listing.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.search_term().is_some() || self.category_filter().is_some() || self.sort != SortKey::Name
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != "all")
    }

    fn matches(&self, term: Option<&str>, product: &Product) -> bool {
        let search_ok = term.is_none_or(|term| {
            product.name.to_lowercase().contains(term)
                || product.description.to_lowercase().contains(term)
        });
        let category_ok = self
            .category_filter()
            .is_none_or(|category| product.category == category);
        search_ok && category_ok
    }
}

/// Apply a query to a product list. The sort is stable.
#[must_use]
pub fn filter_and_sort(products: &[Product], query: &ProductQuery) -> Vec<Product> {
    let term = query.search_term();
    let mut filtered: Vec<Product> = products
        .iter()
        .filter(|product| query.matches(term.as_deref(), product))
        .cloned()
        .collect();

    filtered.sort_by(|a, b| query.sort.compare(a, b));
    filtered
}

/// Catalog reads over the backend.
#[derive(Clone)]
pub struct Catalog {
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

impl Catalog {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Every product.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Vec<Product> {
        self.backend.list_products().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch products");
            Vec::new()
        })
    }

    /// Products flagged for the home page.
    pub async fn featured(&self) -> Vec<Product> {
        self.products()
            .await
            .into_iter()
            .filter(Product::is_featured)
            .collect()
    }

    /// Products matching `query`.
    pub async fn search(&self, query: &ProductQuery) -> Vec<Product> {
        filter_and_sort(&self.products().await, query)
    }

    #[instrument(skip(self))]
    pub async fn categories(&self) -> Vec<Category> {
        self.backend.list_categories().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch categories");
            Vec::new()
        })
    }

    /// Aggregate counts; zeroes when the backend is unavailable.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> ProductStats {
        self.backend.product_stats().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch product stats");
            ProductStats::default()
        })
    }
}
