//! Keyed routing of one stream into several branches.

use crate::core::{handoff, Inlet, Outlet, Sink};
use crate::observability::StageMetrics;
use crate::pipeline::Flow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, trace};

/// Builds the pipeline segment of one branch from that branch's input flow.
pub type Branch<T, O> = Box<dyn FnOnce(Flow<T>) -> Flow<O> + Send>;

/// Boxes a branch builder.
pub fn branch<T, O, F>(build: F) -> Branch<T, O>
where
    F: FnOnce(Flow<T>) -> Flow<O> + Send + 'static,
{
    Box::new(build)
}

/// A sink that routes each element to the branch registered for its key.
///
/// Elements whose key has no branch are dropped and counted in
/// [`Demux::metrics`]. Every branch closes once the demux input closes.
pub struct Demux<T, K, O> {
    inlet: Inlet<T>,
    branches: HashMap<K, Flow<O>>,
    metrics: Arc<StageMetrics>,
}

impl<T, K, O> Demux<T, K, O>
where
    T: Send + 'static,
    K: Eq + Hash + Clone,
    O: Send + 'static,
{
    /// The keys that have a branch output still held by this demux.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.branches.keys()
    }

    /// Removes and returns the output of one branch.
    pub fn take_branch(&mut self, key: &K) -> Option<Flow<O>> {
        self.branches.remove(key)
    }

    /// Removes and returns every remaining branch output.
    pub fn take_branches(&mut self) -> HashMap<K, Flow<O>> {
        std::mem::take(&mut self.branches)
    }

    /// Routing counters: forwarded elements and misses.
    #[must_use]
    pub fn metrics(&self) -> Arc<StageMetrics> {
        self.metrics.clone()
    }
}

impl<T, K, O> Sink<T> for Demux<T, K, O>
where
    T: Send + 'static,
    K: Send + 'static,
    O: Send + 'static,
{
    /// Any branch output not taken beforehand is dropped here; its elements
    /// are then counted as misses.
    fn into_inlet(self) -> Inlet<T> {
        self.inlet
    }
}

impl<T, K: Debug, O> Debug for Demux<T, K, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Demux")
            .field("branches", &self.branches.keys().collect::<Vec<_>>())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Routes every element to the branch whose key equals `key_fn(&element)`.
///
/// Each branch is built by its generator from a flow over that branch's
/// input. Keys without a branch are silently dropped.
pub fn demux<T, K, O, F, B>(key_fn: F, branches: B) -> Demux<T, K, O>
where
    T: Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(&T) -> K + Send + 'static,
    B: IntoIterator<Item = (K, Branch<T, O>)>,
{
    let mut routes = HashMap::new();
    let mut outputs = HashMap::new();
    for (key, build) in branches {
        let (inlet, outlet) = handoff();
        routes.insert(key.clone(), inlet);
        outputs.insert(key, build(Flow::from_source(outlet)));
    }

    let (inlet, input) = handoff();
    let metrics = Arc::new(StageMetrics::new());
    tokio::spawn(route(input, routes, key_fn, metrics.clone()));

    Demux {
        inlet,
        branches: outputs,
        metrics,
    }
}

/// Alias of [`demux`].
pub fn fan_out<T, K, O, F, B>(key_fn: F, branches: B) -> Demux<T, K, O>
where
    T: Send + 'static,
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(&T) -> K + Send + 'static,
    B: IntoIterator<Item = (K, Branch<T, O>)>,
{
    demux(key_fn, branches)
}

async fn route<T, K, F>(
    mut input: Outlet<T>,
    mut routes: HashMap<K, Inlet<T>>,
    key_fn: F,
    metrics: Arc<StageMetrics>,
) where
    K: Eq + Hash + Debug,
    F: Fn(&T) -> K,
{
    while let Some(item) = input.recv().await {
        let key = key_fn(&item);
        let Some(branch) = routes.get(&key) else {
            trace!(key = ?key, "No branch for key, dropping element");
            metrics.record_drop();
            continue;
        };

        if branch.send(item).await.is_ok() {
            metrics.record_forward();
        } else {
            debug!(key = ?key, "Branch closed, removing route");
            routes.remove(&key);
            metrics.record_drop();
        }
    }
    // Dropping the routes closes every branch.
}
