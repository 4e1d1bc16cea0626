//! The flow orchestrator.
//!
//! A [`Flow`] is a fluent handle on the output end of a partially built
//! pipeline. Every [`Flow::thru`], [`Flow::to`] or [`Flow::tee`] spawns a
//! *hop*: a task moving elements from the current outlet into the next
//! component's inlet while watching the flow's cancellation token.

use crate::cancellation::CancellationToken;
use crate::core::{Inlet, Outlet, Pipe, Sink, Source, Stage};
use crate::errors::PipeflowError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Fluent builder over the current end of a pipeline.
pub struct Flow<T> {
    id: Uuid,
    outlet: Outlet<T>,
    token: Arc<CancellationToken>,
}

impl<T: Send + 'static> Flow<T> {
    /// Starts a flow from a source.
    ///
    /// If the source is itself a flow, its cancellation token is inherited;
    /// otherwise the flow is never cancelled unless [`Flow::with_context`]
    /// attaches a token.
    pub fn from_source(source: impl Source<T>) -> Self {
        let token = source
            .cancellation()
            .unwrap_or_else(|| Arc::new(CancellationToken::new()));
        Self {
            id: Uuid::new_v4(),
            outlet: source.into_outlet(),
            token,
        }
    }

    /// Attaches a cancellation token.
    ///
    /// Only hops wired after this call observe the token.
    #[must_use]
    pub fn with_context(mut self, token: Arc<CancellationToken>) -> Self {
        self.token = token;
        self
    }

    /// Identifier used in this flow's log records.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The token every hop of this flow observes.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Returns true if the flow's token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Sends the flow through a stage and continues from its output.
    pub fn thru<O: Send + 'static>(self, stage: impl Stage<T, O>) -> Flow<O> {
        let (inlet, outlet) = stage.into_pipe().split();
        tokio::spawn(hop(self.id, self.outlet, inlet, self.token.clone()));
        Flow {
            id: self.id,
            outlet,
            token: self.token,
        }
    }

    /// Sends the flow through each stage in order.
    #[must_use]
    pub fn thru_all(self, stages: impl IntoIterator<Item = Pipe<T, T>>) -> Self {
        stages.into_iter().fold(self, |flow, stage| flow.thru(stage))
    }

    /// Terminates the flow in a sink.
    ///
    /// Returns as soon as the final hop is running; use
    /// [`Transmission::join`] to wait for it.
    pub fn to(self, sink: impl Sink<T>) -> Transmission {
        let inlet = sink.into_inlet();
        let handle = tokio::spawn(hop(self.id, self.outlet, inlet, self.token));
        Transmission {
            flow: self.id,
            handle,
        }
    }

    /// Hands out the current outlet, ending the builder.
    #[must_use]
    pub fn into_outlet(self) -> Outlet<T> {
        self.outlet
    }

    /// Reads every remaining element into a vector.
    pub async fn collect(self) -> Vec<T> {
        self.outlet.collect().await
    }
}

impl<T: Clone + Send + 'static> Flow<T> {
    /// Duplicates the flow into two stages and returns a flow over each.
    ///
    /// Every element is offered to both stages concurrently, and both
    /// deliveries finish before the next element is read. A branch whose
    /// consumer has gone away is retired; the other keeps receiving.
    pub fn tee<A, B>(self, first: impl Stage<T, A>, second: impl Stage<T, B>) -> (Flow<A>, Flow<B>)
    where
        A: Send + 'static,
        B: Send + 'static,
    {
        let (first_in, first_out) = first.into_pipe().split();
        let (second_in, second_out) = second.into_pipe().split();
        tokio::spawn(tee(
            self.id,
            self.outlet,
            [Some(first_in), Some(second_in)],
            self.token.clone(),
        ));

        let first = Flow {
            id: self.id,
            outlet: first_out,
            token: self.token.clone(),
        };
        let second = Flow {
            id: self.id,
            outlet: second_out,
            token: self.token,
        };
        (first, second)
    }
}

impl<T: Send + 'static> Source<T> for Flow<T> {
    fn into_outlet(self) -> Outlet<T> {
        self.outlet
    }

    fn cancellation(&self) -> Option<Arc<CancellationToken>> {
        Some(self.token.clone())
    }
}

impl<T> std::fmt::Debug for Flow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("id", &self.id)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// What a finished hop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopReport {
    /// Elements delivered downstream.
    pub forwarded: u64,
    /// Whether the hop stopped because the flow was cancelled.
    pub cancelled: bool,
}

/// Handle on a flow's terminal hop.
#[derive(Debug)]
pub struct Transmission {
    flow: Uuid,
    handle: JoinHandle<HopReport>,
}

impl Transmission {
    /// Waits until the terminal hop has closed the sink's input.
    pub async fn join(self) -> Result<HopReport, PipeflowError> {
        let flow = self.flow;
        self.handle
            .await
            .map_err(|e| PipeflowError::task_failed(format!("flow-{flow}"), e.to_string()))
    }

    /// Returns true once the terminal hop has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Moves elements from `upstream` to `downstream` until upstream closes,
/// downstream goes away, or the token fires.
///
/// A cancelled hop drops `upstream` without draining it; the upstream
/// producer's next send then fails and it unwinds in turn.
async fn hop<T>(
    flow: Uuid,
    mut upstream: Outlet<T>,
    downstream: Inlet<T>,
    token: Arc<CancellationToken>,
) -> HopReport {
    let mut report = HopReport::default();

    loop {
        let item = tokio::select! {
            biased;
            () = token.cancelled() => {
                report.cancelled = true;
                break;
            }
            item = upstream.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        tokio::select! {
            biased;
            () = token.cancelled() => {
                report.cancelled = true;
                break;
            }
            sent = downstream.send(item) => {
                if sent.is_err() {
                    debug!(flow = %flow, "Hop downstream closed");
                    break;
                }
            }
        }
        report.forwarded += 1;
    }

    if report.cancelled {
        debug!(
            flow = %flow,
            forwarded = report.forwarded,
            reason = ?token.reason(),
            "Hop cancelled"
        );
    } else {
        debug!(flow = %flow, forwarded = report.forwarded, "Hop finished");
    }
    report
}

async fn offer<T>(branch: Option<&Inlet<T>>, item: T) -> bool {
    match branch {
        Some(inlet) => inlet.send(item).await.is_ok(),
        None => true,
    }
}

async fn tee<T: Clone>(
    flow: Uuid,
    mut upstream: Outlet<T>,
    mut branches: [Option<Inlet<T>>; 2],
    token: Arc<CancellationToken>,
) {
    loop {
        if branches.iter().all(Option::is_none) {
            debug!(flow = %flow, "Every tee branch retired");
            break;
        }

        let item = tokio::select! {
            biased;
            () = token.cancelled() => break,
            item = upstream.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let [first, second] = &branches;
        let delivered = tokio::select! {
            biased;
            () = token.cancelled() => break,
            delivered = async {
                tokio::join!(
                    offer(first.as_ref(), item.clone()),
                    offer(second.as_ref(), item),
                )
            } => delivered,
        };

        for (index, alive) in [delivered.0, delivered.1].into_iter().enumerate() {
            if !alive && branches[index].take().is_some() {
                warn!(flow = %flow, branch = index, "Tee branch closed, retiring it");
            }
        }
    }

    if token.is_cancelled() {
        debug!(flow = %flow, reason = ?token.reason(), "Tee cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handoff;
    use crate::endpoints::{from_iter, to_vec};
    use crate::stages::{map, passthrough};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_thru_and_to() {
        let (sink, collected) = to_vec();
        let report = from_iter([1, 2, 3])
            .thru(map(|i: i32| i * 2))
            .to(sink)
            .join()
            .await
            .unwrap();

        assert_eq!(report, HopReport { forwarded: 3, cancelled: false });
        assert_eq!(collected.wait().await.unwrap(), vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_thru_all_applies_in_order() {
        let got = from_iter([1, 2])
            .thru_all(vec![map(|i: i32| i + 1), map(|i: i32| i * 10)])
            .collect()
            .await;
        assert_eq!(got, vec![20, 30]);
    }

    #[tokio::test]
    async fn test_flow_as_source_inherits_token() {
        let token = Arc::new(CancellationToken::new());
        let inner = from_iter([1]).with_context(token.clone());
        let outer = Flow::from_source(inner);
        assert!(Arc::ptr_eq(outer.token(), &token));
    }

    #[tokio::test]
    async fn test_outlet_source_gets_fresh_token() {
        let (_inlet, outlet) = handoff::<i32>();
        let flow = Flow::from_source(outlet);
        assert!(!flow.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_hop_closes_downstream() {
        let token = Arc::new(CancellationToken::new());
        let (inlet, outlet) = handoff::<i32>();
        let (sink, collected) = to_vec();

        let transmission = Flow::from_source(outlet)
            .with_context(token.clone())
            .to(sink);

        inlet.send(1).await.unwrap();
        token.cancel("test");

        let report = transmission.join().await.unwrap();
        assert!(report.cancelled);
        assert!(collected.wait().await.unwrap().len() <= 1);
        // The hop dropped its upstream outlet.
        inlet.closed().await;
    }

    #[tokio::test]
    async fn test_tee_duplicates_into_both_branches() {
        let (same, negated) = from_iter(1..=5).tee(passthrough(), map(|i: i32| -i));
        let (a, b) = tokio::join!(same.collect(), negated.collect());
        assert_eq!(a, vec![1, 2, 3, 4, 5]);
        assert_eq!(b, vec![-1, -2, -3, -4, -5]);
    }

    #[tokio::test]
    async fn test_tee_retires_closed_branch() {
        let (left, right) = from_iter(1..=4).tee(passthrough(), passthrough());
        drop(right);
        assert_eq!(left.collect().await, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_transmission_reports_downstream_close() {
        let (inlet, outlet) = handoff::<i32>();
        drop(outlet);
        let report = from_iter([1, 2, 3]).to(inlet).join().await.unwrap();
        assert_eq!(report.forwarded, 0);
        assert!(!report.cancelled);
    }
}
