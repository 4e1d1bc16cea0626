//! Ready-made sources.

use crate::core::{handoff, handoff_with_capacity, Outlet};
use crate::pipeline::Flow;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

/// Starts a flow over a fixed collection.
///
/// The queue is filled and closed before this returns, so no task is
/// spawned and the elements are available immediately.
pub fn from_iter<T, I>(items: I) -> Flow<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
{
    let items: Vec<T> = items.into_iter().collect();
    let (inlet, outlet) = handoff_with_capacity(items.len());
    for item in items {
        // Capacity covers every element and the outlet is still held.
        let _ = inlet.try_send(item);
    }
    Flow::from_source(outlet)
}

/// Starts a flow reading from a tokio channel until every sender is gone.
#[must_use]
pub fn from_channel<T: Send + 'static>(rx: mpsc::Receiver<T>) -> Flow<T> {
    Flow::from_source(Outlet::from_receiver(rx))
}

/// Starts a flow draining an async stream.
pub fn from_stream<T, S>(stream: S) -> Flow<T>
where
    T: Send + 'static,
    S: Stream<Item = T> + Send + 'static,
{
    let (inlet, outlet) = handoff();
    tokio::spawn(async move {
        let mut stream = std::pin::pin!(stream);
        while let Some(item) = stream.next().await {
            if inlet.send(item).await.is_err() {
                return;
            }
        }
    });
    Flow::from_source(outlet)
}
