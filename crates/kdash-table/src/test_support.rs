//! Shared test fixtures.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;

use kdash_core::{FetchError, ListResult, Query};

use crate::source::ResourceSource;

pub(crate) type Reply = Result<ListResult<String>, FetchError>;

/// Source whose fetches resolve when the test says so. Rows are the raw
/// strings uppercased.
pub(crate) struct ManualSource {
    pending: Mutex<VecDeque<(Query, oneshot::Sender<Reply>)>>,
    endpoint: Option<String>,
    columns: Vec<String>,
    panic_on_map: AtomicBool,
}

impl ManualSource {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            endpoint: Some("/api/v1/pod".to_string()),
            columns: ["statusicon", "name", "age"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            panic_on_map: AtomicBool::new(false),
        }
    }

    pub(crate) fn without_endpoint() -> Self {
        Self {
            endpoint: None,
            ..Self::new()
        }
    }

    /// Pop the oldest unanswered fetch.
    pub(crate) fn take(&self) -> (Query, oneshot::Sender<Reply>) {
        self.pending.lock().pop_front().expect("no pending fetch")
    }

    /// Pop the newest fetch, dropping every older one.
    pub(crate) fn take_last(&self) -> (Query, oneshot::Sender<Reply>) {
        let mut pending = self.pending.lock();
        let last = pending.pop_back().expect("no pending fetch");
        pending.clear();
        last
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Make the next `map` call panic.
    pub(crate) fn panic_on_map(&self) {
        self.panic_on_map.store(true, Ordering::SeqCst);
    }
}

impl ResourceSource for ManualSource {
    type Raw = String;
    type Row = String;

    fn fetch(&self, query: Query) -> BoxFuture<'static, Reply> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().push_back((query, tx));
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(FetchError::Transport("dropped".to_string())))
        })
    }

    fn map(&self, raw: ListResult<String>) -> Vec<String> {
        if self.panic_on_map.swap(false, Ordering::SeqCst) {
            panic!("malformed row");
        }
        raw.items.into_iter().map(|s| s.to_uppercase()).collect()
    }

    fn display_columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

pub(crate) fn ok(items: &[&str], total: usize) -> Reply {
    Ok(ListResult::new(
        items.iter().map(|s| s.to_string()).collect(),
        total,
    ))
}

/// Let spawned tasks run without advancing the clock.
pub(crate) async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
