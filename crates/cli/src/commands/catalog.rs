//! Catalog commands.
//!
//! # Usage
//!
//! ```bash
//! farmgate products --category Grains --sort price-high
//! farmgate products --featured
//! farmgate categories
//! farmgate stats
//! ```

use farmgate_storefront::Storefront;
use farmgate_storefront::api::Product;
use farmgate_storefront::services::catalog::{ProductQuery, SortKey, filter_and_sort};

use super::CommandError;

/// List products matching the given filters.
#[allow(clippy::print_stdout)]
pub async fn products(
    storefront: &Storefront,
    search: Option<String>,
    category: Option<String>,
    sort: SortKey,
    featured: bool,
) -> Result<(), CommandError> {
    let query = ProductQuery {
        search,
        category,
        sort,
    };

    let products = if featured {
        filter_and_sort(&storefront.catalog().featured().await, &query)
    } else {
        storefront.catalog().search(&query).await
    };

    if products.is_empty() {
        println!("No products found");
        return Ok(());
    }

    for product in &products {
        println!("{}", product_line(storefront, product));
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn categories(storefront: &Storefront) -> Result<(), CommandError> {
    let categories = storefront.catalog().categories().await;
    if categories.is_empty() {
        println!("No categories found");
    }

    for category in categories {
        println!("{:<24} {:>5} items", category.name, category.item_count);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn stats(storefront: &Storefront) -> Result<(), CommandError> {
    let stats = storefront.catalog().stats().await;
    println!("Products:     {}", stats.total);
    println!("Out of stock: {}", stats.out_of_stock);
    Ok(())
}

/// One listing row: id, name, price (with the original when discounted), stock.
pub(super) fn product_line(storefront: &Storefront, product: &Product) -> String {
    let currency = storefront.config().currency;
    let tag = product.price_tag();

    let mut price = currency.format(tag.effective);
    if let Some(original) = tag.original {
        price = format!("{price} (was {}, -{}%)", currency.format(original), tag.discount);
    }

    let stock = if product.in_stock() {
        format!("{} {} left", product.stock, product.unit)
    } else {
        "out of stock".to_string()
    };

    format!("{}  {:<24} {price:<28} {stock}", product.id, product.name)
}
