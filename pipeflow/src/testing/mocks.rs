//! Instrumented stages for tests.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{spawn_stage, Inlet, Outlet, Pipe};

/// A passthrough that sleeps for `delay` before forwarding each element.
#[must_use]
pub fn delay<T: Send + 'static>(delay: Duration) -> Pipe<T, T> {
    spawn_stage(move |mut input: Outlet<T>, output: Inlet<T>| async move {
        while let Some(item) = input.recv().await {
            tokio::time::sleep(delay).await;
            if output.send(item).await.is_err() {
                return;
            }
        }
    })
}

/// What a [`probe`] stage has seen so far.
#[derive(Debug)]
pub struct Probe<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Probe<T> {
    fn clone(&self) -> Self {
        Self {
            seen: self.seen.clone(),
        }
    }
}

impl<T: Clone> Probe<T> {
    /// Elements that passed through, in order.
    #[must_use]
    pub fn seen(&self) -> Vec<T> {
        self.seen.lock().clone()
    }

    /// Number of elements that passed through.
    #[must_use]
    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

/// A passthrough that records a copy of every element it receives.
#[must_use]
pub fn probe<T: Clone + Send + 'static>() -> (Pipe<T, T>, Probe<T>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let pipe = spawn_stage(move |mut input: Outlet<T>, output: Inlet<T>| async move {
        while let Some(item) = input.recv().await {
            recorder.lock().push(item.clone());
            if output.send(item).await.is_err() {
                return;
            }
        }
    });
    (pipe, Probe { seen })
}

/// A stage that never reads its input and never forwards anything.
///
/// It finishes only once its own consumer goes away, so a hop feeding it
/// stays blocked until cancelled.
#[must_use]
pub fn stalled<T: Send + 'static>() -> Pipe<T, T> {
    spawn_stage(|input: Outlet<T>, output: Inlet<T>| async move {
        output.closed().await;
        drop(input);
    })
}
