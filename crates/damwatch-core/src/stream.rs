// ── Reactive snapshot stream ──
//
// Subscription handle over the poller's snapshot channel.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::snapshot::OperationalSnapshot;

/// A subscription to published snapshots.
///
/// `current()` is the snapshot seen at creation (or at the last
/// `changed()`); `latest()` peeks at whatever is published now.
pub struct SnapshotStream {
    current: Arc<OperationalSnapshot>,
    receiver: watch::Receiver<Arc<OperationalSnapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(mut receiver: watch::Receiver<Arc<OperationalSnapshot>>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    pub fn current(&self) -> &Arc<OperationalSnapshot> {
        &self.current
    }

    pub fn latest(&self) -> Arc<OperationalSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published snapshot.
    /// Returns `None` once the dashboard has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<OperationalSnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` that yields the current snapshot first,
    /// then every later one.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by the snapshot `watch::Receiver`.
pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<OperationalSnapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<OperationalSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
