//! Live, recency-ordered view over the history store.

use polisher_core::PolishRecord;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Standing subscription to history snapshots.
///
/// Each snapshot is a finite list ordered most recent first. The view never
/// needs to be re-queried: every successful upsert or delete replaces the
/// snapshot it observes.
#[derive(Clone)]
pub struct HistoryView {
    rx: watch::Receiver<Vec<PolishRecord>>,
}

impl HistoryView {
    pub(crate) fn new(rx: watch::Receiver<Vec<PolishRecord>>) -> Self {
        Self { rx }
    }

    /// Latest snapshot, without marking it as seen.
    pub fn current(&self) -> Vec<PolishRecord> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Vec<PolishRecord>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stream that yields the current snapshot first, then every update.
    ///
    /// Intermediate snapshots may be skipped by a slow consumer; the latest
    /// one is always delivered.
    pub fn into_stream(self) -> WatchStream<Vec<PolishRecord>> {
        WatchStream::new(self.rx)
    }
}
