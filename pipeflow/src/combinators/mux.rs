//! Merging several sources into one stream.

use crate::core::{handoff, Outlet, Source};
use crate::pipeline::Flow;
use rand::Rng;
use tracing::trace;

/// Interleaves several sources into one flow.
///
/// Each step picks one still-open source uniformly at random and forwards
/// its next element; a source that turns out closed is removed. The merged
/// flow closes once every source has closed. No ordering is guaranteed
/// across sources.
pub fn mux<T, S, I>(sources: I) -> Flow<T>
where
    T: Send + 'static,
    S: Source<T>,
    I: IntoIterator<Item = S>,
{
    let sources: Vec<Outlet<T>> = sources.into_iter().map(Source::into_outlet).collect();
    let (inlet, outlet) = handoff();

    tokio::spawn(async move {
        let mut open = sources;
        while !open.is_empty() {
            let idx = rand::thread_rng().gen_range(0..open.len());
            match open[idx].recv().await {
                Some(item) => {
                    if inlet.send(item).await.is_err() {
                        return;
                    }
                }
                None => {
                    open.swap_remove(idx);
                    trace!(remaining = open.len(), "Mux source closed");
                }
            }
        }
    });

    Flow::from_source(outlet)
}

/// Alias of [`mux`].
pub fn fan_in<T, S, I>(sources: I) -> Flow<T>
where
    T: Send + 'static,
    S: Source<T>,
    I: IntoIterator<Item = S>,
{
    mux(sources)
}
