//! Sequential composition of stages.

use crate::core::{Inlet, Outlet, Pipe, Stage};
use tracing::trace;

/// Chains two stages into one: `first`'s output feeds `second`'s input.
///
/// The result accepts input on `first`'s inlet and produces on `second`'s
/// outlet. A copy task between the two closes `second`'s input once
/// `first`'s output closes. Joining is associative.
pub fn join<I, M, O, A, B>(first: A, second: B) -> Pipe<I, O>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
    A: Stage<I, M>,
    B: Stage<M, O>,
{
    let (inlet, upstream) = first.into_pipe().split();
    let (downstream, outlet) = second.into_pipe().split();
    tokio::spawn(relay(upstream, downstream));
    Pipe::new(inlet, outlet)
}

/// Chains any number of same-typed stages in order.
///
/// With no further stages, `first` is returned unchanged.
pub fn join_all<T, S>(first: Pipe<T, T>, rest: S) -> Pipe<T, T>
where
    T: Send + 'static,
    S: IntoIterator<Item = Pipe<T, T>>,
{
    rest.into_iter()
        .fold(first, |joined, next| join::<T, T, T, _, _>(joined, next))
}

async fn relay<T>(mut upstream: Outlet<T>, downstream: Inlet<T>) {
    let mut relayed = 0_u64;
    while let Some(item) = upstream.recv().await {
        if downstream.send(item).await.is_err() {
            trace!(relayed, "Join downstream closed early");
            return;
        }
        relayed += 1;
    }
    trace!(relayed, "Join relay finished");
}
