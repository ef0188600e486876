//! Stream adapter for watch tasks.
//!
//! [`ChangeStream`] is the channel-backed alternative to a change callback: every poll
//! that changes the baseline pushes a copy of the updated baseline into the stream.
//!
//! # Lifecycle
//!
//! 1. Created via [`Watcher::watch_stream`](super::Watcher::watch_stream)
//! 2. Yields updated baselines through `next().await` or `StreamExt`
//! 3. Ends (`None`) once the task stops, whatever the reason
//!
//! The stream does not carry the stop reason; await
//! [`Watcher::wait`](super::Watcher::wait) with the task id for that.
//!
//! # Examples
//!
//! ```ignore
//! use futures::StreamExt;
//! use pollwatch_http::{ApiClient, Watcher, WatchOptions};
//!
//! let watcher = Watcher::new(ApiClient::new("http://example.com/status"));
//! let (id, stream) = watcher.watch_stream(baseline, WatchOptions::new().interval_ms(500));
//!
//! stream
//!     .take(10)
//!     .for_each(|snapshot| async move { println!("{snapshot:?}") })
//!     .await;
//! ```

use super::task::ChangeCallback;
use crate::types::Snapshot;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Stream of updated baselines produced by one watch task.
pub struct ChangeStream {
    receiver: UnboundedReceiverStream<Snapshot>,
}

impl ChangeStream {
    /// Create a stream and the callback that feeds it.
    pub(crate) fn channel() -> (ChangeCallback, ChangeStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: ChangeCallback = Box::new(move |snapshot: &Snapshot| {
            // receiver gone: nobody is listening, keep polling anyway
            let _ = tx.send(snapshot.clone());
        });
        let stream = ChangeStream {
            receiver: UnboundedReceiverStream::new(rx),
        };
        (callback, stream)
    }

    /// Receive the next updated baseline, or `None` once the task has stopped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.next().await
    }
}

impl Stream for ChangeStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}
