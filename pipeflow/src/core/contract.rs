//! The stage contract: the three capability roles every component plays.
//!
//! A [`Source`] produces, a [`Sink`] consumes, a [`Stage`] does both. They
//! only differ in which ends of their handoff queues they hand out, and the
//! orchestrator and combinators only ever talk to components through them.

use super::handoff::{handoff, Inlet, Outlet};
use crate::cancellation::CancellationToken;
use std::future::Future;
use std::sync::Arc;

/// A component that only produces elements.
pub trait Source<T>: Send + 'static {
    /// Hands out the read side of the output queue.
    fn into_outlet(self) -> Outlet<T>;

    /// The cancellation token this source carries, if any.
    ///
    /// Only flows carry one, so a flow used as the source of another flow
    /// passes its cancellation on.
    fn cancellation(&self) -> Option<Arc<CancellationToken>> {
        None
    }
}

/// A component that only consumes elements.
pub trait Sink<T>: Send + 'static {
    /// Hands out the write side of the input queue.
    fn into_inlet(self) -> Inlet<T>;
}

/// A component that consumes `I` and produces `O`.
pub trait Stage<I, O>: Send + 'static {
    /// Hands out both ends.
    fn into_pipe(self) -> Pipe<I, O>;
}

/// The two ends of a running stage: where input goes in and output comes out.
pub struct Pipe<I, O> {
    inlet: Inlet<I>,
    outlet: Outlet<O>,
}

impl<I, O> Pipe<I, O> {
    /// Pairs an input inlet with an output outlet.
    #[must_use]
    pub const fn new(inlet: Inlet<I>, outlet: Outlet<O>) -> Self {
        Self { inlet, outlet }
    }

    /// Splits into the input inlet and the output outlet.
    #[must_use]
    pub fn split(self) -> (Inlet<I>, Outlet<O>) {
        (self.inlet, self.outlet)
    }
}

impl<I, O> std::fmt::Debug for Pipe<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("inlet", &self.inlet)
            .field("outlet", &self.outlet)
            .finish()
    }
}

impl<T: Send + 'static> Source<T> for Outlet<T> {
    fn into_outlet(self) -> Outlet<T> {
        self
    }
}

impl<T: Send + 'static> Sink<T> for Inlet<T> {
    fn into_inlet(self) -> Inlet<T> {
        self
    }
}

impl<I: Send + 'static, O: Send + 'static> Stage<I, O> for Pipe<I, O> {
    fn into_pipe(self) -> Self {
        self
    }
}

/// Starts a stage: creates its two queues and spawns `body` over them.
///
/// `body` receives the stage's input outlet and output inlet. Because the
/// task owns the output inlet, the output closes exactly when `body`
/// returns, which must happen once input is exhausted or downstream is gone.
pub fn spawn_stage<I, O, F, Fut>(body: F) -> Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnOnce(Outlet<I>, Inlet<O>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (inlet, input) = handoff();
    let (output, outlet) = handoff();
    tokio::spawn(body(input, output));
    Pipe::new(inlet, outlet)
}
