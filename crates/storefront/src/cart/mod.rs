//! Cart reconciliation engine.
//!
//! # Architecture
//!
//! - [`CartSnapshot`] is the last-known-good cart with its totals computed
//!   once per replacement. It lives in a session-scoped [`Store`].
//! - [`CartDispatcher`] turns user intents (`set_quantity`, `add`,
//!   `remove`, `clear`) into backend calls. Quantities are always sent as
//!   signed deltas against the snapshot.
//! - [`KeyGate`] tracks which products have an intent in flight and applies
//!   the configured [`SameKeyPolicy`] to overlapping intents.
//! - [`Reconciler`] resolves every settled call back into the snapshot (or
//!   leaves it untouched on failure), publishes notices, and owns one-shot
//!   order placement.
//!
//! [`Store`]: crate::store::Store

mod dispatcher;
mod error;
mod gate;
mod reconcile;
mod snapshot;

pub use dispatcher::{CartDispatcher, MutationOutcome};
pub use error::CartError;
pub use gate::{KeyGate, Permit};
pub use reconcile::Reconciler;
pub use snapshot::{CartSnapshot, CartTotals};

use std::str::FromStr;

/// What happens when an intent arrives for a product that already has one in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SameKeyPolicy {
    /// Fail the new intent with [`CartError::Busy`] without calling the backend.
    #[default]
    Reject,
    /// Run intents one at a time in arrival order.
    Queue,
    /// Only the most recent waiting intent runs; earlier waiters are superseded.
    Coalesce,
}

impl SameKeyPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Queue => "queue",
            Self::Coalesce => "coalesce",
        }
    }
}

impl std::fmt::Display for SameKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SameKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "queue" => Ok(Self::Queue),
            "coalesce" => Ok(Self::Coalesce),
            _ => Err(format!(
                "unknown same-key policy '{s}' (expected reject, queue or coalesce)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!("Queue".parse::<SameKeyPolicy>(), Ok(SameKeyPolicy::Queue));
        assert_eq!(SameKeyPolicy::default(), SameKeyPolicy::Reject);
        assert!("later".parse::<SameKeyPolicy>().is_err());
        assert_eq!(SameKeyPolicy::Coalesce.to_string(), "coalesce");
    }
}
