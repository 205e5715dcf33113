//! Session-scoped snapshot store shared by every view.
//!
//! A [`Store`] holds at most one snapshot. Views subscribe through a
//! `tokio::sync::watch` channel and see every replacement. Once the owning
//! session is torn down the store is closed: it is emptied and late results
//! from in-flight calls are discarded instead of resurrecting stale state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Shared, replace-only holder of the last-known-good snapshot.
#[derive(Debug)]
pub struct Store<S> {
    tx: watch::Sender<Option<Arc<S>>>,
    open: AtomicBool,
}

impl<S> Default for Store<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Store<S> {
    /// An open, empty store.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            open: AtomicBool::new(true),
        }
    }

    /// The current snapshot, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<S>> {
        self.tx.borrow().clone()
    }

    /// Subscribe to snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<S>>> {
        self.tx.subscribe()
    }

    /// Atomically replace the whole snapshot.
    ///
    /// Returns the stored snapshot, or `None` (dropping `snapshot`) when the
    /// store is closed.
    pub fn replace(&self, snapshot: S) -> Option<Arc<S>> {
        if !self.is_open() {
            tracing::debug!("Discarding snapshot for closed store");
            return None;
        }
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Some(Arc::clone(&snapshot)));
        Some(snapshot)
    }

    /// Empty the store without closing it.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Empty the store and refuse further replacements.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.tx.send_replace(None);
    }

    /// Whether the store still accepts snapshots.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_current() {
        let store = Store::new();
        assert!(store.current().is_none());

        assert!(store.replace(3_u32).is_some());
        assert_eq!(store.current().as_deref(), Some(&3));

        store.clear();
        assert!(store.current().is_none());
        assert!(store.is_open());
    }

    #[tokio::test]
    async fn test_subscribers_see_replacements() {
        let store = Store::new();
        let mut rx = store.subscribe();

        store.replace("first".to_string());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_deref().map(String::as_str), Some("first"));

        store.close();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn test_closed_store_discards_late_results() {
        let store = Store::new();
        store.replace(1_u8);
        store.close();

        assert!(store.replace(2_u8).is_none());
        assert!(store.current().is_none());
    }
}
