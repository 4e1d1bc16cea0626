//! Handoff queues: the single-producer/single-consumer conduit between stages.

use crate::errors::{SendError, TrySendError};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Capacity of a default handoff queue.
///
/// tokio has no zero-capacity channel, so a one-slot queue is the closest
/// thing to a rendezvous: a producer can run at most one element ahead.
pub const HANDOFF_CAPACITY: usize = 1;

/// Creates a connected handoff queue with the default capacity.
#[must_use]
pub fn handoff<T>() -> (Inlet<T>, Outlet<T>) {
    handoff_with_capacity(HANDOFF_CAPACITY)
}

/// Creates a connected handoff queue holding up to `capacity` elements.
///
/// A capacity of zero is coerced to one.
#[must_use]
pub fn handoff_with_capacity<T>(capacity: usize) -> (Inlet<T>, Outlet<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Inlet { tx }, Outlet { rx })
}

/// The write side of a handoff queue.
///
/// An inlet has exactly one owner. Dropping it closes the queue, so a queue
/// is closed once, by its producer, and nothing can be delivered afterwards.
pub struct Inlet<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Inlet<T> {
    /// Delivers an element, waiting for room in the queue.
    ///
    /// Fails, handing the element back, once the consumer has gone away.
    pub async fn send(&self, item: T) -> Result<(), SendError<T>> {
        self.tx.send(item).await
    }

    /// Delivers an element only if the queue has room right now.
    pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
        self.tx.try_send(item)
    }

    /// Returns true if the consumer side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer side has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    /// Closes the queue. Equivalent to dropping the inlet.
    pub fn close(self) {}

    /// Another producer handle onto the same queue.
    ///
    /// Only merge points use this: the queue then closes once every fork
    /// has been dropped.
    pub(crate) fn fork(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Inlet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inlet")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The read side of a handoff queue.
pub struct Outlet<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Outlet<T> {
    /// Wraps a tokio receiver.
    #[must_use]
    pub fn from_receiver(rx: mpsc::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Receives the next element, or `None` at end of stream.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Drains the queue until its producer closes it.
    pub async fn collect(mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.rx.recv().await {
            items.push(item);
        }
        items
    }
}

impl<T> Stream for Outlet<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> std::fmt::Debug for Outlet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outlet").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_handoff_preserves_fifo_order() {
        let (inlet, outlet) = handoff();
        tokio::spawn(async move {
            for i in 1..=4 {
                inlet.send(i).await.unwrap();
            }
        });

        assert_eq!(outlet.collect().await, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_dropping_inlet_ends_stream() {
        let (inlet, mut outlet) = handoff::<i32>();
        inlet.close();
        assert_eq!(outlet.recv().await, None);
    }

    #[tokio::test]
    async fn test_send_fails_after_consumer_dropped() {
        let (inlet, outlet) = handoff();
        drop(outlet);

        assert!(inlet.is_closed());
        let err = inlet.send(7).await.unwrap_err();
        assert_eq!(err.0, 7);
    }

    #[tokio::test]
    async fn test_forks_close_together() {
        let (inlet, outlet) = handoff_with_capacity(4);
        let fork = inlet.fork();
        inlet.send(1).await.unwrap();
        drop(inlet);
        fork.send(2).await.unwrap();
        drop(fork);

        assert_eq!(outlet.collect().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_outlet_is_a_stream() {
        let (inlet, outlet) = handoff_with_capacity(3);
        for i in 0..3 {
            inlet.send(i).await.unwrap();
        }
        drop(inlet);

        let doubled: Vec<i32> = outlet.map(|i| i * 2).collect().await;
        assert_eq!(doubled, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_try_send_respects_capacity() {
        let (inlet, mut outlet) = handoff();
        inlet.try_send(1).unwrap();
        assert!(matches!(inlet.try_send(2), Err(TrySendError::Full(2))));
        assert_eq!(outlet.recv().await, Some(1));
    }

    #[test]
    fn test_zero_capacity_is_coerced() {
        let (inlet, _outlet) = handoff_with_capacity::<u8>(0);
        assert!(!inlet.is_closed());
    }
}
