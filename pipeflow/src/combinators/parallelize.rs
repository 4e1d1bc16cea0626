//! Replicating a stage across concurrent workers.

use crate::cancellation::{CancellationToken, StructuredTaskGroup};
use crate::core::{handoff, Inlet, Outlet, Pipe, Stage};
use crate::errors::{ConfigError, PipeflowError};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Runs `size` copies of the stage built by `factory` side by side.
///
/// Workers contend for upstream elements and their outputs are merged into
/// one stream. **Ordering is not preserved** for `size > 1`: an element may
/// overtake one admitted before it, so downstream stages must not rely on
/// input order. The merged output closes only after every worker has
/// finished. If the merged output's consumer goes away, the group token is
/// cancelled and every worker stops pulling from upstream.
///
/// A `size` of one returns the factory's stage itself, order included.
///
/// # Errors
///
/// A `size` of zero is a configuration error. It is returned as
/// [`PipeflowError::InvalidConfig`] at call time instead of aborting the
/// process, so callers decide whether it is fatal.
pub fn parallelize<I, O, S, F>(size: usize, factory: F) -> Result<Pipe<I, O>, PipeflowError>
where
    I: Send + 'static,
    O: Send + 'static,
    S: Stage<I, O>,
    F: Fn() -> S,
{
    if size == 0 {
        return Err(ConfigError::parallel_size(size).into());
    }
    if size == 1 {
        return Ok(factory().into_pipe());
    }

    let (inlet, input) = handoff();
    let (output, outlet) = handoff();
    let input = Arc::new(Mutex::new(input));
    let group = StructuredTaskGroup::new("parallelize");

    for worker in 0..size {
        let (worker_in, worker_out) = factory().into_pipe().split();
        let input = input.clone();
        let output = output.fork();
        group.spawn(format!("worker-{worker}"), move |token| async move {
            tokio::join!(
                feed(input, worker_in, &token),
                drain(worker_out, output, &token)
            );
            Ok(())
        });
    }

    tokio::spawn(async move {
        if let Err(e) = group.wait().await {
            warn!(error = %e, "Parallel worker failed");
        }
        debug!(workers = size, "Parallel workers finished");
        drop(output);
    });

    Ok(Pipe::new(inlet, outlet))
}

/// Pulls shared upstream elements into one worker until either side closes
/// or the group is cancelled.
async fn feed<T>(input: Arc<Mutex<Outlet<T>>>, worker: Inlet<T>, token: &CancellationToken) {
    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => return,
            next = async { input.lock().await.recv().await } => next,
        };
        let Some(item) = next else { return };
        if worker.send(item).await.is_err() {
            return;
        }
    }
}

/// Moves one worker's output into the merged output.
///
/// A closed merged output cancels the group so idle workers stop feeding.
async fn drain<T>(mut worker: Outlet<T>, output: Inlet<T>, token: &CancellationToken) {
    while let Some(item) = worker.recv().await {
        if output.send(item).await.is_err() {
            token.cancel("merged output closed");
            return;
        }
    }
}
