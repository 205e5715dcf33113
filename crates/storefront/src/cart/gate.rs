//! Per-product busy tracking for cart intents.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use farmgate_core::ProductId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::SameKeyPolicy;
use super::error::CartError;

#[derive(Debug, Default)]
struct Slot {
    /// Serializes intents for one product. Tokio's mutex is fair, so waiters
    /// acquire it in arrival order.
    lock: Arc<AsyncMutex<()>>,
    /// Intents currently running or waiting.
    holders: usize,
    /// Sequence number of the newest intent.
    latest: u64,
}

type Slots = Arc<Mutex<HashMap<ProductId, Slot>>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<ProductId, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks products with an intent in flight and applies the [`SameKeyPolicy`].
#[derive(Debug, Clone)]
pub struct KeyGate {
    policy: SameKeyPolicy,
    slots: Slots,
}

/// Marks one intent as registered for a product; unregisters on drop.
#[derive(Debug)]
struct Ticket {
    slots: Slots,
    key: ProductId,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.holders = slot.holders.saturating_sub(1);
            if slot.holders == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

/// Exclusive right to mutate one product; the product stays busy until dropped.
#[derive(Debug)]
pub struct Permit {
    _guard: OwnedMutexGuard<()>,
    _ticket: Ticket,
}

impl KeyGate {
    #[must_use]
    pub fn new(policy: SameKeyPolicy) -> Self {
        Self {
            policy,
            slots: Arc::default(),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> SameKeyPolicy {
        self.policy
    }

    /// Wait for the right to mutate `key`.
    ///
    /// Returns `Ok(None)` when a newer intent for the same product superseded
    /// this one under [`SameKeyPolicy::Coalesce`]. Dropping the returned
    /// future or permit releases the busy marker.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Busy` under [`SameKeyPolicy::Reject`] when the
    /// product already has an intent in flight.
    pub async fn enter(&self, key: &ProductId) -> Result<Option<Permit>, CartError> {
        let (mutex, sequence, ticket) = {
            let mut slots = lock(&self.slots);
            let slot = slots.entry(key.clone()).or_default();

            if self.policy == SameKeyPolicy::Reject && slot.holders > 0 {
                return Err(CartError::Busy(key.clone()));
            }

            slot.holders += 1;
            slot.latest += 1;

            let ticket = Ticket {
                slots: Arc::clone(&self.slots),
                key: key.clone(),
            };
            (Arc::clone(&slot.lock), slot.latest, ticket)
        };

        let guard = mutex.lock_owned().await;

        if self.policy == SameKeyPolicy::Coalesce {
            let latest = lock(&self.slots).get(key).map_or(sequence, |slot| slot.latest);
            if latest != sequence {
                tracing::debug!(product = %key, "Cart intent superseded by a newer one");
                return Ok(None);
            }
        }

        Ok(Some(Permit {
            _guard: guard,
            _ticket: ticket,
        }))
    }

    /// Whether `key` has an intent running or waiting.
    #[must_use]
    pub fn is_busy(&self, key: &ProductId) -> bool {
        lock(&self.slots).contains_key(key)
    }

    /// Every product with an intent running or waiting.
    #[must_use]
    pub fn busy(&self) -> Vec<ProductId> {
        let mut keys: Vec<ProductId> = lock(&self.slots).keys().cloned().collect();
        keys.sort();
        keys
    }
}
