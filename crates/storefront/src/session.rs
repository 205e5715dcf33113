//! Per-login session context.
//!
//! A [`SessionContext`] exists exactly while a user is logged in. It owns
//! the cart and wishlist snapshots; [`SessionContext::logout`] (or dropping
//! the context) closes them, so results that arrive after teardown are
//! discarded.

use std::sync::{Arc, PoisonError, RwLock};

use farmgate_core::UserId;
use tracing::{info, instrument};

use crate::api::{Backend, Order, ProfileUpdate, User, UserAddress};
use crate::cart::{CartDispatcher, CartError, SameKeyPolicy};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::notify::Notifier;
use crate::services::auth::{AuthError, AuthService};
use crate::services::orders;
use crate::services::wishlist::WishlistActions;

/// State owned by one authenticated session.
pub struct SessionContext {
    user_id: UserId,
    user: RwLock<User>,
    cart: CartDispatcher,
    wishlist: WishlistActions,
    backend: Arc<dyn Backend>,
    notifier: Notifier,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("user_id", &self.user_id)
            .field("cart", &self.cart)
            .field("wishlist", &self.wishlist)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Start a session for `user`: load the cart and wishlist concurrently.
    ///
    /// Load failures leave the corresponding snapshot absent; they are
    /// logged and not retried.
    #[instrument(skip_all, fields(user = %user.id))]
    pub async fn start(
        backend: Arc<dyn Backend>,
        notifier: Notifier,
        user: User,
        policy: SameKeyPolicy,
    ) -> Self {
        set_sentry_user(&user.id, Some(&user.email));

        let user_id = user.id.clone();
        let cart = CartDispatcher::new(
            Arc::clone(&backend),
            notifier.clone(),
            user_id.clone(),
            policy,
        );
        let wishlist = WishlistActions::new(Arc::clone(&backend), notifier.clone(), user_id.clone());

        let (cart_loaded, wishlist_loaded) = tokio::join!(cart.refresh(), wishlist.refresh());
        info!(
            cart_loaded = cart_loaded.is_some(),
            wishlist_loaded = wishlist_loaded.is_some(),
            "Session started"
        );

        Self {
            user_id,
            user: RwLock::new(user),
            cart,
            wishlist,
            backend,
            notifier,
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The logged-in user as last returned by the backend.
    #[must_use]
    pub fn user(&self) -> User {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub const fn cart(&self) -> &CartDispatcher {
        &self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &WishlistActions {
        &self.wishlist
    }

    /// Place a cash-on-delivery order for the cart.
    ///
    /// # Errors
    ///
    /// See [`crate::cart::Reconciler::place_order`].
    pub async fn place_order(&self, delivery_address: Option<UserAddress>) -> Result<Order, CartError> {
        self.cart.place_order(delivery_address).await
    }

    /// The user's orders, newest first (empty if the backend is unavailable).
    pub async fn orders(&self) -> Vec<Order> {
        orders::history(self.backend.as_ref(), &self.user_id).await
    }

    /// Re-fetch the profile from the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend failure; the cached user is kept.
    pub async fn refresh_profile(&self) -> Result<User, AuthError> {
        let user = self
            .backend
            .fetch_profile()
            .await
            .map_err(|e| AuthError::from_api(e, "Failed to load profile"))?;
        self.set_user(user.clone());
        Ok(user)
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns the validation or backend failure; the cached user is kept.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, AuthError> {
        let user = AuthService::new(self.backend.as_ref(), &self.notifier)
            .update_profile(update)
            .await?;
        self.set_user(user.clone());
        Ok(user)
    }

    /// End the session.
    ///
    /// Local state is torn down first and unconditionally; a failed backend
    /// logout is reported but the session is gone either way.
    ///
    /// # Errors
    ///
    /// Returns the backend logout failure.
    #[instrument(skip(self), fields(user = %self.user_id))]
    pub async fn logout(self) -> Result<(), AuthError> {
        self.teardown();
        AuthService::new(self.backend.as_ref(), &self.notifier)
            .logout()
            .await
    }

    fn set_user(&self, user: User) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }

    fn teardown(&self) {
        if self.cart.reconciler().is_closed() {
            return;
        }
        self.cart.close();
        self.wishlist.close();
        clear_sentry_user();
        info!(user = %self.user_id, "Session closed");
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.teardown();
    }
}
