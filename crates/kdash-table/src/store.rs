//! Observable table store.
//!
//! Mutation = notification: every method that changes the store also
//! broadcasts the new snapshot. Only the fetch coordinator mutates the
//! store; everything else reads it.

use parking_lot::RwLock;
use tokio::sync::watch;

/// What the rendering layer reads.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot<R> {
    /// Rows of the most recent completed, current fetch.
    pub rows: Vec<R>,

    /// Total items across all pages, as reported by the endpoint.
    pub total_items: usize,

    /// Whether the loading indicator is shown.
    pub is_loading: bool,
}

impl<R> Default for TableSnapshot<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            total_items: 0,
            is_loading: false,
        }
    }
}

/// A table store that automatically broadcasts changes.
///
/// Uses `parking_lot::RwLock` for the snapshot (never poisons) and
/// `tokio::sync::watch` for broadcasts.
pub struct TableStore<R> {
    inner: RwLock<TableSnapshot<R>>,
    tx: watch::Sender<TableSnapshot<R>>,
    /// Kept alive so sends never fail for lack of receivers.
    _rx: watch::Receiver<TableSnapshot<R>>,
}

impl<R: Clone> TableStore<R> {
    /// Create an empty store.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(TableSnapshot::default());
        Self {
            inner: RwLock::new(TableSnapshot::default()),
            tx,
            _rx: rx,
        }
    }

    // =========================================================================
    // Mutation Methods (crate-private, all broadcast automatically)
    // =========================================================================

    /// Replace rows and total, and clear the loading flag.
    pub(crate) fn commit(&self, rows: Vec<R>, total_items: usize) {
        let snapshot = {
            let mut inner = self.inner.write();
            inner.rows = rows;
            inner.total_items = total_items;
            inner.is_loading = false;
            tracing::debug!(
                "Committed {} rows ({} total)",
                inner.rows.len(),
                inner.total_items
            );
            inner.clone()
        };
        let _ = self.tx.send(snapshot);
    }

    /// Set the loading flag. Broadcasts only if it changed.
    pub(crate) fn set_loading(&self, loading: bool) {
        let snapshot = {
            let mut inner = self.inner.write();
            if inner.is_loading == loading {
                return;
            }
            inner.is_loading = loading;
            inner.clone()
        };
        let _ = self.tx.send(snapshot);
    }

    // =========================================================================
    // Read Methods
    // =========================================================================

    /// Subscribe to store changes.
    pub fn subscribe(&self) -> watch::Receiver<TableSnapshot<R>> {
        self.tx.subscribe()
    }

    /// Get a copy of the current snapshot.
    pub fn snapshot(&self) -> TableSnapshot<R> {
        self.inner.read().clone()
    }

    /// Get a copy of the current rows.
    pub fn rows(&self) -> Vec<R> {
        self.inner.read().rows.clone()
    }

    pub fn total_items(&self) -> usize {
        self.inner.read().total_items
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().is_loading
    }
}

impl<R: Clone> Default for TableStore<R> {
    fn default() -> Self {
        Self::new()
    }
}
