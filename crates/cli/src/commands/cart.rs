//! Cart, checkout, and order history commands.
//!
//! # Usage
//!
//! ```bash
//! farmgate cart add 65f0c3 --quantity 2
//! farmgate cart set 65f0c3 0      # same as remove
//! farmgate order place --district Gasabo --sector Remera
//! farmgate orders
//! ```

use farmgate_core::ProductId;
use farmgate_storefront::Storefront;
use farmgate_storefront::cart::MutationOutcome;
use farmgate_storefront::session::SessionContext;

use super::{AddressArgs, CommandError};

#[allow(clippy::print_stdout)]
pub fn show(storefront: &Storefront, session: &SessionContext) -> Result<(), CommandError> {
    let Some(snapshot) = session.cart().snapshot() else {
        println!("Cart could not be loaded");
        return Ok(());
    };

    if snapshot.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }

    let currency = storefront.config().currency;
    for line in &snapshot.cart().items {
        println!(
            "{}  {:<24} {:>4} x {:<12} {}",
            line.product.id,
            line.product.name,
            line.quantity,
            currency.format(line.product.effective_price()),
            currency.format(line.line_total()),
        );
    }

    println!(
        "{} items, subtotal {}",
        snapshot.item_count(),
        currency.format(snapshot.subtotal())
    );
    Ok(())
}

pub async fn add(
    storefront: &Storefront,
    session: &SessionContext,
    product: &str,
    quantity: i64,
) -> Result<(), CommandError> {
    let outcome = session.cart().add(&ProductId::new(product), quantity).await?;
    report(outcome);
    show(storefront, session)
}

pub async fn set(
    storefront: &Storefront,
    session: &SessionContext,
    product: &str,
    quantity: i64,
) -> Result<(), CommandError> {
    let outcome = session
        .cart()
        .set_quantity(&ProductId::new(product), quantity)
        .await?;
    report(outcome);
    show(storefront, session)
}

pub async fn remove(
    storefront: &Storefront,
    session: &SessionContext,
    product: &str,
) -> Result<(), CommandError> {
    session.cart().remove(&ProductId::new(product)).await?;
    show(storefront, session)
}

pub async fn clear(session: &SessionContext) -> Result<(), CommandError> {
    session.cart().clear().await?;
    Ok(())
}

/// Place an order, delivering to the given address or else the profile's.
#[allow(clippy::print_stdout)]
pub async fn place_order(
    storefront: &Storefront,
    session: &SessionContext,
    address: AddressArgs,
) -> Result<(), CommandError> {
    let address = address
        .into_address()
        .or_else(|| session.user().address.filter(|a| !a.is_empty()));

    let order = session.place_order(address).await?;

    println!(
        "Order {} ({}): {} via {}",
        order.order_number.as_deref().unwrap_or(order.id.as_str()),
        order.status,
        storefront.config().currency.format(order.total_amount),
        order.payment_method,
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn orders(storefront: &Storefront, session: &SessionContext) -> Result<(), CommandError> {
    let orders = session.orders().await;
    if orders.is_empty() {
        println!("No orders yet");
        return Ok(());
    }

    let currency = storefront.config().currency;
    for order in &orders {
        let placed = order
            .created_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{}  {placed}  {}  {}",
            order.order_number.as_deref().unwrap_or(order.id.as_str()),
            order.status,
            currency.format(order.total_amount),
        );

        for item in &order.items {
            println!(
                "    {:<24} {:>4} x {}",
                item.display_name(),
                item.quantity,
                currency.format(item.unit_price()),
            );
        }

        if let Some(address) = order.delivery_address.as_ref().and_then(|a| a.formatted()) {
            println!("    Deliver to: {address}");
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn report(outcome: MutationOutcome) {
    match outcome {
        MutationOutcome::Applied => {}
        MutationOutcome::Unchanged => println!("Quantity unchanged"),
        MutationOutcome::Superseded => println!("Superseded by a newer change"),
    }
}
