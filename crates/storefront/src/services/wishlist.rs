//! Wishlist snapshot and actions.
//!
//! Same replace-on-success model as the cart, without quantities: the
//! server's wishlist replaces the snapshot after every call, failures leave
//! it untouched and publish the backend's message.

use std::sync::Arc;

use farmgate_core::{ProductId, UserId};
use tokio::sync::watch;
use tracing::{instrument, warn};

use crate::api::{ApiError, Backend, Wishlist};
use crate::notify::Notifier;
use crate::store::Store;

/// Session-scoped wishlist.
pub struct WishlistActions {
    backend: Arc<dyn Backend>,
    store: Store<Wishlist>,
    notifier: Notifier,
    user: UserId,
}

impl std::fmt::Debug for WishlistActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistActions")
            .field("user", &self.user)
            .field("open", &self.store.is_open())
            .finish_non_exhaustive()
    }
}

impl WishlistActions {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier, user: UserId) -> Self {
        Self {
            backend,
            store: Store::new(),
            notifier,
            user,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Wishlist>> {
        self.store.current()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Wishlist>>> {
        self.store.subscribe()
    }

    /// Whether a product is on the wishlist (false without a snapshot).
    #[must_use]
    pub fn contains(&self, product: &ProductId) -> bool {
        self.snapshot()
            .is_some_and(|w| w.items.iter().any(|item| &item.id == product))
    }

    /// Number of products on the wishlist.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().map_or(0, |w| w.items.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-fetch the wishlist; a failure keeps the previous snapshot.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn refresh(&self) -> Option<Arc<Wishlist>> {
        match self.backend.fetch_wishlist(&self.user).await {
            Ok(wishlist) => self.store.replace(wishlist),
            Err(e) => {
                warn!(error = %e, "Failed to fetch wishlist");
                self.snapshot()
            }
        }
    }

    /// # Errors
    ///
    /// Returns the backend failure; the snapshot is left unchanged.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn add(&self, product: &ProductId) -> Result<(), ApiError> {
        let result = self.backend.add_to_wishlist(&self.user, product).await;
        self.settle(result, "Item added to wishlist!", "Failed to add item to wishlist")
    }

    /// # Errors
    ///
    /// Returns the backend failure; the snapshot is left unchanged.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn remove(&self, product: &ProductId) -> Result<(), ApiError> {
        let result = self.backend.remove_from_wishlist(&self.user, product).await;
        self.settle(
            result,
            "Item removed from wishlist!",
            "Failed to remove item from wishlist",
        )
    }

    /// # Errors
    ///
    /// Returns the backend failure; the snapshot is left unchanged.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn clear(&self) -> Result<(), ApiError> {
        let result = self.backend.clear_wishlist(&self.user).await;
        self.settle(result, "Wishlist cleared!", "Failed to clear wishlist")
    }

    /// Add the product if absent, remove it if present.
    ///
    /// Returns whether the product is on the wishlist afterwards.
    ///
    /// # Errors
    ///
    /// Returns the backend failure; the snapshot is left unchanged.
    pub async fn toggle(&self, product: &ProductId) -> Result<bool, ApiError> {
        if self.contains(product) {
            self.remove(product).await?;
        } else {
            self.add(product).await?;
        }
        Ok(self.contains(product))
    }

    /// Discard the snapshot; results still in flight are ignored.
    pub fn close(&self) {
        self.store.close();
    }

    fn settle(
        &self,
        result: Result<Wishlist, ApiError>,
        success: &str,
        fallback: &str,
    ) -> Result<(), ApiError> {
        match result {
            Ok(wishlist) => {
                if self.store.replace(wishlist).is_some() {
                    self.notifier.success(success);
                }
                Ok(())
            }
            Err(e) => {
                if self.store.is_open() {
                    warn!(user = %self.user, error = %e, "Wishlist operation failed");
                    self.notifier.error(e.backend_message().unwrap_or(fallback));
                }
                Err(e)
            }
        }
    }
}
