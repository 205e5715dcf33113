//! Wishlist commands.
//!
//! # Usage
//!
//! ```bash
//! farmgate wishlist toggle 65f0c3
//! farmgate wishlist show
//! ```

use farmgate_core::ProductId;
use farmgate_storefront::Storefront;
use farmgate_storefront::session::SessionContext;

use super::CommandError;
use super::catalog::product_line;

#[allow(clippy::print_stdout)]
pub fn show(storefront: &Storefront, session: &SessionContext) -> Result<(), CommandError> {
    let Some(wishlist) = session.wishlist().snapshot() else {
        println!("Wishlist could not be loaded");
        return Ok(());
    };

    if wishlist.items.is_empty() {
        println!("Your wishlist is empty");
    }

    for product in &wishlist.items {
        println!("{}", product_line(storefront, product));
    }
    Ok(())
}

pub async fn add(session: &SessionContext, product: &str) -> Result<(), CommandError> {
    session.wishlist().add(&ProductId::new(product)).await?;
    Ok(())
}

pub async fn remove(session: &SessionContext, product: &str) -> Result<(), CommandError> {
    session.wishlist().remove(&ProductId::new(product)).await?;
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn toggle(session: &SessionContext, product: &str) -> Result<(), CommandError> {
    let saved = session.wishlist().toggle(&ProductId::new(product)).await?;
    println!("{product} is {}on the wishlist", if saved { "" } else { "not " });
    Ok(())
}

pub async fn clear(session: &SessionContext) -> Result<(), CommandError> {
    session.wishlist().clear().await?;
    Ok(())
}
