//! Fetch coordination.
//!
//! Every trigger starts a new cycle and bumps the cycle generation. A
//! cycle's fetch and loading timer only touch the store while their
//! generation is still current, so the latest trigger always wins and late
//! results of superseded cycles are dropped silently.
//!
//! ## Cycle Flow
//!
//! ```text
//!  trigger ──► generation += 1 ──► spawn fetch
//!                    │                 │
//!                    ▼                 │
//!             spawn loading timer      │
//!                    │                 │
//!         delay elapsed, still         │
//!         current and in flight?       │
//!                    │                 ▼
//!                    ▼          completion: current?
//!          is_loading = true       │          │
//!                                 yes         no ──► discard
//!                                  │
//!                        cancel timer, clear loading,
//!                        commit rows or notify error
//! ```

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use kdash_core::{FetchError, ListResult, Query};

use super::TableId;
use crate::source::{Notifier, ResourceSource};
use crate::store::TableStore;

// =============================================================================
// Cycle State
// =============================================================================

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Implicit first load at construction.
    Initial,
    SortChanged,
    PageChanged,
    FilterChanged,
    /// Re-fetch with unchanged selections.
    Refresh,
}

/// Phase of the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Idle,
    /// Fetch pending, loading indicator not shown yet.
    InFlight,
    /// Fetch pending past the flicker-avoidance delay.
    InFlightWithLoadingShown,
}

/// Emitted after every committed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListUpdate {
    /// Identifier of the list that changed.
    pub list_id: String,

    pub total_items: usize,

    /// Whether a name filter was applied.
    pub filtered: bool,
}

#[derive(Debug, Default)]
struct CycleState {
    generation: u64,
    phase: FetchPhase,
    timer: Option<JoinHandle<()>>,
}

// =============================================================================
// Fetch Coordinator
// =============================================================================

/// Runs fetch cycles for one table and publishes results to its store.
pub struct FetchCoordinator<S: ResourceSource> {
    table_id: TableId,
    list_id: String,
    source: Arc<S>,
    store: Arc<TableStore<S::Row>>,
    notifier: Arc<dyn Notifier>,
    loading_delay: Duration,
    cycle: Mutex<CycleState>,
    updates: broadcast::Sender<ListUpdate>,
}

impl<S: ResourceSource> FetchCoordinator<S> {
    /// Create an idle coordinator.
    pub fn new(
        table_id: TableId,
        list_id: String,
        source: Arc<S>,
        store: Arc<TableStore<S::Row>>,
        notifier: Arc<dyn Notifier>,
        loading_delay: Duration,
    ) -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            table_id,
            list_id,
            source,
            store,
            notifier,
            loading_delay,
            cycle: Mutex::new(CycleState::default()),
            updates,
        }
    }

    /// Subscribe to committed list updates.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<ListUpdate> {
        self.updates.subscribe()
    }

    pub fn phase(&self) -> FetchPhase {
        self.cycle.lock().phase
    }

    /// Start a new cycle, superseding any cycle in flight.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start_cycle(self: &Arc<Self>, trigger: Trigger, query: Query, filtered: bool) {
        let generation = {
            let mut cycle = self.cycle.lock();
            cycle.generation += 1;
            let generation = cycle.generation;

            if let Some(timer) = cycle.timer.take() {
                timer.abort();
            }

            // A superseded cycle that already shows the indicator hands it
            // over; the new cycle only arms a timer when none is shown.
            if cycle.phase == FetchPhase::InFlightWithLoadingShown {
                tracing::debug!(
                    table = %self.table_id,
                    generation,
                    "Loading indicator carried over"
                );
            } else {
                cycle.phase = FetchPhase::InFlight;
                cycle.timer = Some(self.spawn_loading_timer(generation));
            }
            generation
        };

        tracing::debug!(
            table = %self.table_id,
            generation,
            ?trigger,
            sort_by = %query.sort_by,
            page = query.page,
            filter_by = %query.filter_by,
            "Starting fetch cycle"
        );

        let fetch = self.source.fetch(query);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = fetch.await;
            this.complete(generation, filtered, result);
        });
    }

    /// Supersede every pending cycle without starting a new one.
    ///
    /// Clears the loading indicator; rows stay as they are.
    pub fn cancel(&self) {
        let mut cycle = self.cycle.lock();
        cycle.generation += 1;
        if let Some(timer) = cycle.timer.take() {
            timer.abort();
        }
        cycle.phase = FetchPhase::Idle;
        self.store.set_loading(false);
        tracing::debug!(table = %self.table_id, "Pending cycles cancelled");
    }

    fn spawn_loading_timer(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let delay = self.loading_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.show_loading(generation);
        })
    }

    fn show_loading(&self, generation: u64) {
        let mut cycle = self.cycle.lock();
        if cycle.generation != generation || cycle.phase != FetchPhase::InFlight {
            return;
        }
        cycle.phase = FetchPhase::InFlightWithLoadingShown;
        cycle.timer = None;
        // Store writes happen under the cycle lock so a completion cannot
        // interleave between the check and the write.
        self.store.set_loading(true);
        tracing::debug!(table = %self.table_id, generation, "Showing loading indicator");
    }

    /// End a current cycle whose rows could not be mapped. Rows stay as
    /// they are.
    fn abandon(&self, generation: u64) {
        let mut cycle = self.cycle.lock();
        if cycle.generation != generation {
            return;
        }
        if let Some(timer) = cycle.timer.take() {
            timer.abort();
        }
        cycle.phase = FetchPhase::Idle;
        self.store.set_loading(false);
        tracing::error!(table = %self.table_id, generation, "Mapping rows panicked");
    }

    fn complete(
        &self,
        generation: u64,
        filtered: bool,
        result: Result<ListResult<S::Raw>, FetchError>,
    ) {
        // `map` runs outside the cycle lock, before any cycle state changes.
        let mapped = match result {
            Ok(raw) => {
                let total_items = raw.total_items;
                match panic::catch_unwind(AssertUnwindSafe(|| self.source.map(raw))) {
                    Ok(rows) => Ok((rows, total_items)),
                    Err(payload) => {
                        self.abandon(generation);
                        panic::resume_unwind(payload);
                    }
                }
            }
            Err(error) => Err(error),
        };

        let outcome = {
            let mut cycle = self.cycle.lock();
            if cycle.generation != generation {
                tracing::debug!(
                    table = %self.table_id,
                    generation,
                    current = cycle.generation,
                    "Discarding superseded result"
                );
                return;
            }

            if let Some(timer) = cycle.timer.take() {
                timer.abort();
            }
            cycle.phase = FetchPhase::Idle;

            match mapped {
                Ok((rows, total_items)) => {
                    self.store.commit(rows, total_items);
                    Ok(total_items)
                }
                Err(error) => {
                    self.store.set_loading(false);
                    Err(error)
                }
            }
        };

        // Collaborators run outside the cycle lock; they may start new cycles.
        match outcome {
            Ok(total_items) => {
                let _ = self.updates.send(ListUpdate {
                    list_id: self.list_id.clone(),
                    total_items,
                    filtered,
                });
            }
            Err(error) => {
                tracing::debug!(table = %self.table_id, generation, "Fetch failed: {}", error);
                self.notifier.notify(&error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockNotifier;
    use crate::test_support::{ok, settle, ManualSource};

    fn query(page: usize) -> Query {
        Query {
            sort_by: "d,creationTimestamp".to_string(),
            items_per_page: 10,
            page,
            filter_by: String::new(),
        }
    }

    fn coordinator(
        notifier: MockNotifier,
    ) -> (Arc<FetchCoordinator<ManualSource>>, Arc<ManualSource>, Arc<TableStore<String>>) {
        let source = Arc::new(ManualSource::new());
        let store = Arc::new(TableStore::new());
        let coordinator = Arc::new(FetchCoordinator::new(
            TableId::new(),
            "pods".to_string(),
            source.clone(),
            store.clone(),
            Arc::new(notifier),
            Duration::from_millis(100),
        ));
        (coordinator, source, store)
    }

    fn quiet() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        notifier
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_maps_rows_and_uses_reported_total() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        settle().await;
        assert_eq!(coordinator.phase(), FetchPhase::InFlight);

        let (sent, reply) = source.take();
        assert_eq!(sent.page, 1);
        reply.send(ok(&["web-1", "web-2"], 40)).unwrap();
        settle().await;

        let snapshot = store.snapshot();
        assert_eq!(snapshot.rows, vec!["WEB-1", "WEB-2"]);
        assert_eq!(snapshot.total_items, 40);
        assert!(!snapshot.is_loading);
        assert_eq!(coordinator.phase(), FetchPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_after_newer_completion_is_discarded() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        coordinator.start_cycle(Trigger::PageChanged, query(2), false);
        settle().await;
        let (_, reply_a) = source.take();
        let (_, reply_b) = source.take();

        reply_b.send(ok(&["b"], 2)).unwrap();
        settle().await;
        assert_eq!(store.rows(), vec!["B"]);

        reply_a.send(ok(&["a"], 1)).unwrap();
        settle().await;
        assert_eq!(store.rows(), vec!["B"]);
        assert_eq!(store.total_items(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_before_newer_completion_is_discarded() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        coordinator.start_cycle(Trigger::FilterChanged, query(1), true);
        settle().await;
        let (_, reply_a) = source.take();
        let (_, reply_b) = source.take();

        reply_a.send(ok(&["a"], 1)).unwrap();
        settle().await;
        assert!(store.rows().is_empty());
        assert_eq!(coordinator.phase(), FetchPhase::InFlight);

        reply_b.send(ok(&["b"], 1)).unwrap();
        settle().await;
        assert_eq!(store.rows(), vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_cycle_commits_when_it_finishes_first() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        settle().await;
        source.take().1.send(ok(&["a"], 1)).unwrap();
        settle().await;
        assert_eq!(store.rows(), vec!["A"]);

        coordinator.start_cycle(Trigger::PageChanged, query(2), false);
        settle().await;
        assert_eq!(store.rows(), vec!["A"]);

        source.take().1.send(ok(&["b"], 1)).unwrap();
        settle().await;
        assert_eq!(store.rows(), vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_fetch_never_shows_loading() {
        let (coordinator, source, store) = coordinator(quiet());
        let mut rx = store.subscribe();

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        tokio::time::sleep(Duration::from_millis(30)).await;
        source.take().1.send(ok(&["a"], 1)).unwrap();
        settle().await;

        // Only the commit was broadcast, never a loading snapshot.
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_loading);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!store.is_loading());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_shows_loading_until_completion() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(!store.is_loading());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(store.is_loading());
        assert_eq!(coordinator.phase(), FetchPhase::InFlightWithLoadingShown);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(store.is_loading());

        source.take().1.send(ok(&["a"], 1)).unwrap();
        settle().await;
        assert!(!store.is_loading());
        assert_eq!(store.rows(), vec!["A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseding_cycle_restarts_the_delay() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        tokio::time::sleep(Duration::from_millis(80)).await;
        coordinator.start_cycle(Trigger::PageChanged, query(2), false);

        // The first cycle's timer would have fired at 100ms.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!store.is_loading());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.is_loading());
        assert_eq!(source.pending(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shown_loading_carries_over_to_new_cycle() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.is_loading());

        coordinator.start_cycle(Trigger::PageChanged, query(2), false);
        settle().await;
        assert!(store.is_loading());

        let (_, reply_a) = source.take();
        let (_, reply_b) = source.take();
        reply_a.send(ok(&["a"], 1)).unwrap();
        settle().await;
        assert!(store.is_loading());

        reply_b.send(ok(&["b"], 1)).unwrap();
        settle().await;
        assert!(!store.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_rows_and_notifies() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|e| matches!(e, FetchError::Status { code: 500, .. }))
            .times(1)
            .return_const(());
        let (coordinator, source, store) = coordinator(notifier);

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        settle().await;
        source.take().1.send(ok(&["a"], 7)).unwrap();
        settle().await;

        coordinator.start_cycle(Trigger::Refresh, query(1), false);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.is_loading());

        source
            .take()
            .1
            .send(Err(FetchError::Status {
                code: 500,
                message: "boom".to_string(),
            }))
            .unwrap();
        settle().await;

        let snapshot = store.snapshot();
        assert_eq!(snapshot.rows, vec!["A"]);
        assert_eq!(snapshot.total_items, 7);
        assert!(!snapshot.is_loading);
        assert_eq!(coordinator.phase(), FetchPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_failure_is_silent() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        coordinator.start_cycle(Trigger::PageChanged, query(2), false);
        settle().await;

        source
            .take()
            .1
            .send(Err(FetchError::Transport("reset".to_string())))
            .unwrap();
        settle().await;
        assert_eq!(coordinator.phase(), FetchPhase::InFlight);

        source.take().1.send(ok(&["b"], 1)).unwrap();
        settle().await;
        assert_eq!(store.rows(), vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_update_after_commit() {
        let (coordinator, source, _store) = coordinator(quiet());
        let mut updates = coordinator.subscribe_updates();

        coordinator.start_cycle(Trigger::FilterChanged, query(1), true);
        settle().await;
        source.take().1.send(ok(&["a"], 3)).unwrap();
        settle().await;

        let update = updates.try_recv().unwrap();
        assert_eq!(
            update,
            ListUpdate {
                list_id: "pods".to_string(),
                total_items: 3,
                filtered: true,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_map_clears_loading() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        settle().await;
        source.take().1.send(ok(&["a"], 1)).unwrap();
        settle().await;

        coordinator.start_cycle(Trigger::Refresh, query(1), false);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.is_loading());

        source.panic_on_map();
        source.take().1.send(ok(&["b"], 1)).unwrap();
        settle().await;

        let snapshot = store.snapshot();
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.rows, vec!["A"]);
        assert_eq!(coordinator.phase(), FetchPhase::Idle);

        // The next cycle starts from a clean phase and arms a fresh timer.
        coordinator.start_cycle(Trigger::Refresh, query(1), false);
        assert_eq!(coordinator.phase(), FetchPhase::InFlight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_cycle() {
        let (coordinator, source, store) = coordinator(quiet());

        coordinator.start_cycle(Trigger::Initial, query(1), false);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.is_loading());

        coordinator.cancel();
        assert!(!store.is_loading());

        source.take().1.send(ok(&["a"], 1)).unwrap();
        settle().await;
        assert!(store.rows().is_empty());
        assert_eq!(coordinator.phase(), FetchPhase::Idle);
    }
}
