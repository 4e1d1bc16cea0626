//! Ready-made sinks.
//!
//! Each sink runs a task consuming its input queue. Sinks that produce a
//! result hand back a [`Completion`] resolving once the input has closed.

use crate::core::{handoff, Inlet, Outlet, Sink};
use crate::errors::PipeflowError;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A sink backed by a spawned consumer task.
#[derive(Debug)]
pub struct TaskSink<T> {
    inlet: Inlet<T>,
}

impl<T: Send + 'static> Sink<T> for TaskSink<T> {
    fn into_inlet(self) -> Inlet<T> {
        self.inlet
    }
}

/// Resolves to a sink's result once its input has closed.
#[derive(Debug)]
pub struct Completion<R> {
    name: &'static str,
    handle: JoinHandle<R>,
}

impl<R> Completion<R> {
    /// Waits for the sink to drain its input.
    pub async fn wait(self) -> Result<R, PipeflowError> {
        let name = self.name;
        self.handle
            .await
            .map_err(|e| PipeflowError::task_failed(name, e.to_string()))
    }
}

/// Everything a [`to_vec`] sink received, in arrival order.
pub type Collected<T> = Completion<Vec<T>>;

/// The number of elements a counting sink consumed.
pub type Drained = Completion<u64>;

fn spawn_sink<T, R, F, Fut>(name: &'static str, body: F) -> (TaskSink<T>, Completion<R>)
where
    T: Send + 'static,
    R: Send + 'static,
    F: FnOnce(Outlet<T>) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let (inlet, outlet) = handoff();
    let handle = tokio::spawn(body(outlet));
    (TaskSink { inlet }, Completion { name, handle })
}

/// Collects every element into a vector.
#[must_use]
pub fn to_vec<T: Send + 'static>() -> (TaskSink<T>, Collected<T>) {
    spawn_sink("to_vec", |outlet: Outlet<T>| outlet.collect())
}

/// Discards every element, counting them.
#[must_use]
pub fn to_null<T: Send + 'static>() -> (TaskSink<T>, Drained) {
    for_each(drop)
}

/// Calls `f` on every element.
pub fn for_each<T, F>(mut f: F) -> (TaskSink<T>, Drained)
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    spawn_sink("for_each", move |mut outlet: Outlet<T>| async move {
        let mut count = 0_u64;
        while let Some(item) = outlet.recv().await {
            f(item);
            count += 1;
        }
        count
    })
}

/// Forwards every element into a tokio channel.
///
/// The sender is dropped once input closes, so the receiver sees the end of
/// the stream.
#[must_use]
pub fn to_channel<T: Send + 'static>(tx: mpsc::Sender<T>) -> TaskSink<T> {
    let (sink, _forwarding) = spawn_sink("to_channel", |mut outlet: Outlet<T>| async move {
        while let Some(item) = outlet.recv().await {
            if tx.send(item).await.is_err() {
                return;
            }
        }
    });
    sink
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::from_iter;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_to_vec() {
        let (sink, collected) = to_vec();
        from_iter([1, 2, 3]).to(sink);
        assert_eq!(collected.wait().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_to_null_counts() {
        let (sink, drained) = to_null();
        from_iter(0..25).to(sink);
        assert_eq!(drained.wait().await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_for_each_sees_every_element() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (sink, done) = for_each({
            let seen = seen.clone();
            move |item: &str| seen.lock().unwrap().push(item.to_uppercase())
        });

        from_iter(["x", "y"]).to(sink);
        assert_eq!(done.wait().await.unwrap(), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["X", "Y"]);
    }

    #[tokio::test]
    async fn test_to_channel_closes_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        from_iter([5, 6]).to(to_channel(tx));

        assert_eq!(rx.recv().await, Some(5));
        assert_eq!(rx.recv().await, Some(6));
        assert_eq!(rx.recv().await, None);
    }
}
