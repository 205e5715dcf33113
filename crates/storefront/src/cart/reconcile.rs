//! Resolves settled cart calls back into the session snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use farmgate_core::{ProductId, UserId};
use tokio::sync::watch;
use tracing::{instrument, warn};

use super::error::CartError;
use super::snapshot::CartSnapshot;
use crate::api::{ApiError, Backend, Cart, Order, UserAddress};
use crate::error::add_breadcrumb;
use crate::notify::Notifier;
use crate::services::orders;
use crate::store::Store;

const ORDER_PLACED: &str = "Order placed successfully!";
const ORDER_FAILED: &str = "Failed to place order";

/// Owns the cart snapshot for one session and applies server results to it.
pub struct Reconciler {
    backend: Arc<dyn Backend>,
    store: Store<CartSnapshot>,
    notifier: Notifier,
    user: UserId,
    placing: AtomicBool,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("user", &self.user)
            .field("open", &self.store.is_open())
            .field("placing", &self.placing.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight order flag when placement ends, however it ends.
struct PlacingGuard<'a>(&'a AtomicBool);

impl Drop for PlacingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier, user: UserId) -> Self {
        Self {
            backend,
            store: Store::new(),
            notifier,
            user,
            placing: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn user(&self) -> &UserId {
        &self.user
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// The current snapshot, absent until the first successful fetch.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<CartSnapshot>> {
        self.store.current()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CartSnapshot>>> {
        self.store.subscribe()
    }

    /// Last-known quantity of a product (0 when absent).
    #[must_use]
    pub fn quantity_of(&self, product: &ProductId) -> i64 {
        self.snapshot().map_or(0, |s| s.quantity_of(product))
    }

    /// Whether the session has been torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.store.is_open()
    }

    /// Discard the snapshot and ignore every later result.
    pub fn close(&self) {
        self.store.close();
    }

    /// Re-fetch the cart and replace the snapshot.
    ///
    /// A failed refresh keeps the previous snapshot (or none, on the initial
    /// load) and is only logged.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn refresh(&self) -> Option<Arc<CartSnapshot>> {
        match self.backend.fetch_cart(&self.user).await {
            Ok(cart) => self.store.replace(CartSnapshot::new(cart)),
            Err(e) => {
                warn!(error = %e, "Failed to fetch cart");
                self.snapshot()
            }
        }
    }

    /// Apply the outcome of a mutation call.
    ///
    /// On success the snapshot is replaced with the server's cart and
    /// `success` (if any) is published. On failure the snapshot is left
    /// untouched, an error notice is published, and stock errors trigger a
    /// refresh.
    ///
    /// # Errors
    ///
    /// Returns the classified failure.
    pub async fn settle(
        &self,
        result: Result<Cart, ApiError>,
        success: Option<&str>,
        fallback: &str,
    ) -> Result<(), CartError> {
        match result {
            Ok(cart) => {
                if self.store.replace(CartSnapshot::new(cart)).is_some()
                    && let Some(message) = success
                {
                    self.notifier.success(message);
                }
                Ok(())
            }
            Err(source) => Err(self.fail(CartError::classify(source, fallback)).await),
        }
    }

    /// Publish a failure and refresh when it calls for it.
    async fn fail(&self, err: CartError) -> CartError {
        if self.is_closed() {
            return err;
        }

        warn!(user = %self.user, error = %err, "Cart operation failed");
        self.notifier.error(err.to_string());

        if err.requires_refresh() {
            self.refresh().await;
        }
        err
    }

    /// Place a cash-on-delivery order for the current cart.
    ///
    /// The cart is re-fetched first; an empty fresh cart is rejected without
    /// calling the backend. After the order is accepted the cart is cleared;
    /// a failure to clear is reported but does not fail the order.
    ///
    /// # Errors
    ///
    /// Returns `CartError::OrderInProgress` if another placement is running,
    /// `CartError::EmptyCart` for an empty cart, or the classified backend
    /// failure.
    #[instrument(skip(self, delivery_address), fields(user = %self.user))]
    pub async fn place_order(
        &self,
        delivery_address: Option<UserAddress>,
    ) -> Result<Order, CartError> {
        if self
            .placing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CartError::OrderInProgress);
        }
        let _placing = PlacingGuard(&self.placing);

        let fresh = match self.backend.fetch_cart(&self.user).await {
            Ok(cart) => cart,
            Err(source) => {
                return Err(self.fail(CartError::classify(source, ORDER_FAILED)).await);
            }
        };

        if fresh.is_empty() {
            self.store.replace(CartSnapshot::new(fresh));
            return Err(self.fail(CartError::EmptyCart).await);
        }

        let request = orders::build_order_request(&self.user, &fresh, delivery_address);
        self.store.replace(CartSnapshot::new(fresh));

        let line_count = request.items.len().to_string();
        add_breadcrumb("order", "Placing order", Some(&[("lines", line_count.as_str())]));

        let order = match self.backend.place_order(&request).await {
            Ok(order) => order,
            Err(source) => {
                return Err(self.fail(CartError::classify(source, ORDER_FAILED)).await);
            }
        };

        tracing::info!(order_id = %order.id, "Order placed");
        self.notifier.success(ORDER_PLACED);

        let cleared = self.backend.clear_cart(&self.user).await;
        if let Err(e) = self.settle(cleared, Some("Cart cleared!"), "Failed to clear cart").await {
            warn!(order_id = %order.id, error = %e, "Order placed but cart was not cleared");
        }

        Ok(order)
    }
}
