//! Translates cart intents into backend calls.

use std::sync::Arc;

use farmgate_core::{ProductId, UserId};
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::SameKeyPolicy;
use super::error::CartError;
use super::gate::KeyGate;
use super::reconcile::Reconciler;
use super::snapshot::CartSnapshot;
use crate::api::{Backend, CartAdjustment, Order, UserAddress};
use crate::error::add_breadcrumb;
use crate::notify::Notifier;

/// How an intent ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The backend accepted the change and the snapshot was replaced.
    Applied,
    /// Nothing to send (the target already matched the snapshot).
    Unchanged,
    /// A newer intent for the same product replaced this one before it ran.
    Superseded,
}

/// Session-scoped cart facade: intents in, reconciled snapshots out.
///
/// Cheap to clone; clones share the snapshot and busy markers.
#[derive(Debug, Clone)]
pub struct CartDispatcher {
    reconciler: Arc<Reconciler>,
    gate: KeyGate,
}

impl CartDispatcher {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        notifier: Notifier,
        user: UserId,
        policy: SameKeyPolicy,
    ) -> Self {
        Self {
            reconciler: Arc::new(Reconciler::new(backend, notifier, user)),
            gate: KeyGate::new(policy),
        }
    }

    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// The current snapshot, absent until the first successful fetch.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<CartSnapshot>> {
        self.reconciler.snapshot()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CartSnapshot>>> {
        self.reconciler.subscribe()
    }

    /// Total quantity across all lines (0 without a snapshot).
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.snapshot().map_or(0, |s| s.item_count())
    }

    /// Products with an intent running or waiting.
    #[must_use]
    pub fn busy(&self) -> Vec<ProductId> {
        self.gate.busy()
    }

    #[must_use]
    pub fn is_busy(&self, product: &ProductId) -> bool {
        self.gate.is_busy(product)
    }

    /// Re-fetch the cart from the backend.
    pub async fn refresh(&self) -> Option<Arc<CartSnapshot>> {
        self.reconciler.refresh().await
    }

    /// Set a line to an absolute quantity.
    ///
    /// A target of zero or less removes the line. Otherwise the signed
    /// difference from the current snapshot is sent as a delta.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Busy` under the reject policy, or the classified
    /// backend failure (the snapshot is left unchanged).
    #[instrument(skip(self), fields(user = %self.reconciler.user()))]
    pub async fn set_quantity(
        &self,
        product: &ProductId,
        target: i64,
    ) -> Result<MutationOutcome, CartError> {
        if target <= 0 {
            return self.remove(product).await;
        }

        let Some(_permit) = self.gate.enter(product).await? else {
            return Ok(MutationOutcome::Superseded);
        };

        let delta = target - self.reconciler.quantity_of(product);
        if delta == 0 {
            debug!("Quantity already at target");
            return Ok(MutationOutcome::Unchanged);
        }

        self.send_delta(product, delta, None, "Failed to update quantity")
            .await
    }

    /// Add `quantity` units of a product. A non-positive quantity adds
    /// nothing and is `Unchanged`; use `set_quantity` or `remove` to reduce.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Busy` under the reject policy, or the classified
    /// backend failure (the snapshot is left unchanged).
    #[instrument(skip(self), fields(user = %self.reconciler.user()))]
    pub async fn add(
        &self,
        product: &ProductId,
        quantity: i64,
    ) -> Result<MutationOutcome, CartError> {
        if quantity <= 0 {
            debug!(quantity, "Ignoring add of a non-positive quantity");
            return Ok(MutationOutcome::Unchanged);
        }

        let Some(_permit) = self.gate.enter(product).await? else {
            return Ok(MutationOutcome::Superseded);
        };

        self.send_delta(
            product,
            quantity,
            Some("Item added to cart!"),
            "Failed to add item to cart",
        )
        .await
    }

    /// Remove a product's line entirely.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Busy` under the reject policy, or the classified
    /// backend failure (the snapshot is left unchanged).
    #[instrument(skip(self), fields(user = %self.reconciler.user()))]
    pub async fn remove(&self, product: &ProductId) -> Result<MutationOutcome, CartError> {
        let Some(_permit) = self.gate.enter(product).await? else {
            return Ok(MutationOutcome::Superseded);
        };

        add_breadcrumb("cart", "Remove from cart", Some(&[("product", product.as_str())]));

        let user = self.reconciler.user();
        let result = self.reconciler.backend().remove_from_cart(user, product).await;
        self.reconciler
            .settle(
                result,
                Some("Item removed from cart!"),
                "Failed to remove item from cart",
            )
            .await?;

        Ok(MutationOutcome::Applied)
    }

    /// Remove every line in one backend call.
    ///
    /// # Errors
    ///
    /// Returns the classified backend failure (the snapshot is left unchanged).
    #[instrument(skip(self), fields(user = %self.reconciler.user()))]
    pub async fn clear(&self) -> Result<MutationOutcome, CartError> {
        add_breadcrumb("cart", "Clear cart", None);

        let user = self.reconciler.user();
        let result = self.reconciler.backend().clear_cart(user).await;
        self.reconciler
            .settle(result, Some("Cart cleared!"), "Failed to clear cart")
            .await?;

        Ok(MutationOutcome::Applied)
    }

    /// Place a cash-on-delivery order for the current cart.
    ///
    /// # Errors
    ///
    /// See [`Reconciler::place_order`].
    pub async fn place_order(
        &self,
        delivery_address: Option<UserAddress>,
    ) -> Result<Order, CartError> {
        self.reconciler.place_order(delivery_address).await
    }

    /// Discard the snapshot; results still in flight are ignored.
    pub fn close(&self) {
        self.reconciler.close();
    }

    async fn send_delta(
        &self,
        product: &ProductId,
        delta: i64,
        success: Option<&str>,
        fallback: &str,
    ) -> Result<MutationOutcome, CartError> {
        let delta_label = delta.to_string();
        add_breadcrumb(
            "cart",
            "Adjust cart quantity",
            Some(&[("product", product.as_str()), ("delta", delta_label.as_str())]),
        );

        let adjustment = CartAdjustment {
            user_id: self.reconciler.user().clone(),
            product_id: product.clone(),
            quantity: delta,
        };

        let result = self.reconciler.backend().adjust_cart(&adjustment).await;
        self.reconciler.settle(result, success, fallback).await?;

        Ok(MutationOutcome::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use mockall::predicate::{always, eq};

    use super::*;
    use crate::api::{Cart, MockBackend};
    use crate::test_support::{api_error, cart_with, user_id};

    fn dispatcher(mock: MockBackend, policy: SameKeyPolicy) -> CartDispatcher {
        CartDispatcher::new(Arc::new(mock), Notifier::new(), user_id(), policy)
    }

    fn adjustment(product: &str, quantity: i64) -> CartAdjustment {
        CartAdjustment {
            user_id: user_id(),
            product_id: ProductId::new(product),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_set_quantity_sends_delta() {
        let mut mock = MockBackend::new();
        mock.expect_fetch_cart()
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 2)])));
        mock.expect_adjust_cart()
            .with(eq(adjustment("p1", 3)))
            .times(1)
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 5)])));

        let cart = dispatcher(mock, SameKeyPolicy::Reject);
        cart.refresh().await;

        let outcome = cart.set_quantity(&ProductId::new("p1"), 5).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);
        assert_eq!(cart.item_count(), 5);
        assert!(!cart.is_busy(&ProductId::new("p1")));
    }

    #[tokio::test]
    async fn test_set_quantity_decrease_sends_negative_delta() {
        let mut mock = MockBackend::new();
        mock.expect_fetch_cart()
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 4)])));
        mock.expect_adjust_cart()
            .with(eq(adjustment("p1", -3)))
            .times(1)
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 1)])));

        let cart = dispatcher(mock, SameKeyPolicy::Reject);
        cart.refresh().await;
        cart.set_quantity(&ProductId::new("p1"), 1).await.unwrap();
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes() {
        let mut mock = MockBackend::new();
        mock.expect_fetch_cart()
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 2)])));
        mock.expect_adjust_cart().never();
        mock.expect_remove_from_cart()
            .with(eq(user_id()), eq(ProductId::new("p1")))
            .times(1)
            .returning(|user, _| Ok(Cart::empty_for(user)));

        let cart = dispatcher(mock, SameKeyPolicy::Reject);
        cart.refresh().await;

        cart.set_quantity(&ProductId::new("p1"), 0).await.unwrap();
        assert_eq!(cart.item_count(), 0);
    }

    #[tokio::test]
    async fn test_unchanged_target_sends_nothing() {
        let mut mock = MockBackend::new();
        mock.expect_fetch_cart()
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 2)])));
        mock.expect_adjust_cart().never();

        let cart = dispatcher(mock, SameKeyPolicy::Reject);
        cart.refresh().await;

        let outcome = cart.set_quantity(&ProductId::new("p1"), 2).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_add_non_positive_quantity_sends_nothing() {
        let mut mock = MockBackend::new();
        mock.expect_fetch_cart()
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 3)])));
        mock.expect_adjust_cart().never();

        let cart = dispatcher(mock, SameKeyPolicy::Reject);
        cart.refresh().await;

        for quantity in [0, -5, i64::MIN] {
            let outcome = cart.add(&ProductId::new("p1"), quantity).await.unwrap();
            assert_eq!(outcome, MutationOutcome::Unchanged);
        }
        assert_eq!(cart.item_count(), 3);
        assert!(!cart.is_busy(&ProductId::new("p1")));
    }

    #[tokio::test]
    async fn test_add_without_snapshot_sends_positive_delta() {
        let mut mock = MockBackend::new();
        mock.expect_adjust_cart()
            .with(eq(adjustment("p9", 1)))
            .times(1)
            .returning(|_| Ok(cart_with(&[("p9", "3", "0", 1)])));

        let cart = dispatcher(mock, SameKeyPolicy::Reject);
        cart.add(&ProductId::new("p9"), 1).await.unwrap();
        assert_eq!(cart.snapshot().unwrap().quantity_of(&ProductId::new("p9")), 1);
    }

    #[tokio::test]
    async fn test_clear_failure_keeps_snapshot() {
        let mut mock = MockBackend::new();
        mock.expect_fetch_cart()
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 2), ("p2", "1", "0", 1)])));
        mock.expect_clear_cart()
            .with(always())
            .returning(|_| Err(api_error(503, None)));

        let cart = dispatcher(mock, SameKeyPolicy::Reject);
        let before = cart.refresh().await.unwrap();

        let err = cart.clear().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to clear cart");
        assert_eq!(cart.snapshot().unwrap(), before);
    }

    #[tokio::test]
    async fn test_reject_policy_fails_fast() {
        let mut mock = MockBackend::new();
        mock.expect_adjust_cart().never();
        mock.expect_remove_from_cart().never();

        let cart = dispatcher(mock, SameKeyPolicy::Reject);
        let p1 = ProductId::new("p1");
        let held = cart.gate.enter(&p1).await.unwrap();
        assert_eq!(cart.busy(), vec![p1.clone()]);

        assert!(matches!(cart.add(&p1, 1).await, Err(CartError::Busy(_))));
        assert!(matches!(cart.set_quantity(&p1, 0).await, Err(CartError::Busy(_))));

        drop(held);
        assert!(cart.busy().is_empty());
    }

    #[tokio::test]
    async fn test_queue_policy_recomputes_delta() {
        let mut mock = MockBackend::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_adjust_cart()
            .with(eq(adjustment("p1", 2)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 2)])));
        mock.expect_adjust_cart()
            .with(eq(adjustment("p1", 3)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 5)])));

        let cart = dispatcher(mock, SameKeyPolicy::Queue);
        let p1 = ProductId::new("p1");
        let held = cart.gate.enter(&p1).await.unwrap();

        let first = {
            let cart = cart.clone();
            tokio::spawn(async move { cart.set_quantity(&ProductId::new("p1"), 2).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = {
            let cart = cart.clone();
            tokio::spawn(async move { cart.set_quantity(&ProductId::new("p1"), 5).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(first.await.unwrap().unwrap(), MutationOutcome::Applied);
        assert_eq!(second.await.unwrap().unwrap(), MutationOutcome::Applied);
        assert_eq!(cart.item_count(), 5);
    }

    #[tokio::test]
    async fn test_coalesce_policy_runs_latest_only() {
        let mut mock = MockBackend::new();
        mock.expect_adjust_cart()
            .with(eq(adjustment("p1", 7)))
            .times(1)
            .returning(|_| Ok(cart_with(&[("p1", "10", "0", 7)])));

        let cart = dispatcher(mock, SameKeyPolicy::Coalesce);
        let p1 = ProductId::new("p1");
        let held = cart.gate.enter(&p1).await.unwrap();

        let stale = {
            let cart = cart.clone();
            tokio::spawn(async move { cart.set_quantity(&ProductId::new("p1"), 3).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let latest = {
            let cart = cart.clone();
            tokio::spawn(async move { cart.set_quantity(&ProductId::new("p1"), 7).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(stale.await.unwrap().unwrap(), MutationOutcome::Superseded);
        assert_eq!(latest.await.unwrap().unwrap(), MutationOutcome::Applied);
        assert_eq!(cart.item_count(), 7);
    }
}
