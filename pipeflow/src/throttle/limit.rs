//! Rate-limited admission in front of a stage.

use super::RateLimiter;
use crate::cancellation::CancellationToken;
use crate::core::{handoff, Inlet, Outlet, Pipe, Stage};
use crate::observability::StageMetrics;
use crate::stages::passthrough;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// How an element waits for the limiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// Suspend until a permit is available.
    #[default]
    Wait,
    /// Poll the limiter, yielding to the scheduler between attempts.
    Poll,
}

/// Configuration for a [`Throttle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitOptions {
    /// Admission strategy.
    pub admission: Admission,
}

impl LimitOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the admission strategy.
    #[must_use]
    pub const fn with_admission(mut self, admission: Admission) -> Self {
        self.admission = admission;
        self
    }
}

/// Builder for a rate-limited stage.
///
/// Each element is received, admitted by the limiter, then forwarded into
/// the wrapped stage. Cancellation aborts a pending admission, drops the
/// element being admitted and closes the wrapped stage's input.
pub struct Throttle<L> {
    limiter: L,
    token: Arc<CancellationToken>,
    options: LimitOptions,
    metrics: Arc<StageMetrics>,
}

impl<L: RateLimiter + 'static> Throttle<L> {
    /// Creates a throttle that is never cancelled.
    pub fn new(limiter: L) -> Self {
        Self {
            limiter,
            token: Arc::new(CancellationToken::new()),
            options: LimitOptions::default(),
            metrics: Arc::new(StageMetrics::new()),
        }
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_context(mut self, token: Arc<CancellationToken>) -> Self {
        self.token = token;
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: LimitOptions) -> Self {
        self.options = options;
        self
    }

    /// Admission counters: forwarded elements, dropped elements and time
    /// spent waiting.
    #[must_use]
    pub fn metrics(&self) -> Arc<StageMetrics> {
        self.metrics.clone()
    }

    /// Puts the throttle in front of `stage`.
    ///
    /// The returned pipe's output is the wrapped stage's output.
    pub fn wrap<I, O>(self, stage: impl Stage<I, O>) -> Pipe<I, O>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        let (stage_in, outlet) = stage.into_pipe().split();
        let (inlet, input) = handoff();
        tokio::spawn(admit(self, input, stage_in));
        Pipe::new(inlet, outlet)
    }
}

impl<L> std::fmt::Debug for Throttle<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("options", &self.options)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Rate-limits the input of `stage`.
pub fn limit<I, O, L>(limiter: L, stage: impl Stage<I, O>) -> Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    L: RateLimiter + 'static,
{
    Throttle::new(limiter).wrap(stage)
}

/// Rate-limits the input of `stage`, stopping when `token` fires.
pub fn limit_with_context<I, O, L>(
    token: Arc<CancellationToken>,
    limiter: L,
    stage: impl Stage<I, O>,
) -> Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    L: RateLimiter + 'static,
{
    Throttle::new(limiter).with_context(token).wrap(stage)
}

/// A rate-limited passthrough.
pub fn throttle<T, L>(limiter: L) -> Pipe<T, T>
where
    T: Send + 'static,
    L: RateLimiter + 'static,
{
    limit(limiter, passthrough())
}

async fn acquire<L: RateLimiter>(limiter: &L, admission: Admission) {
    match admission {
        Admission::Wait => limiter.acquire().await,
        Admission::Poll => {
            while !limiter.try_acquire() {
                tokio::task::yield_now().await;
            }
        }
    }
}

async fn admit<L: RateLimiter, T>(throttle: Throttle<L>, mut input: Outlet<T>, stage_in: Inlet<T>) {
    let Throttle {
        limiter,
        token,
        options,
        metrics,
    } = throttle;

    loop {
        let item = tokio::select! {
            biased;
            () = token.cancelled() => break,
            item = input.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let started = Instant::now();
        tokio::select! {
            biased;
            () = token.cancelled() => {
                metrics.record_drop();
                debug!(reason = ?token.reason(), "Throttle cancelled during admission, dropping element");
                break;
            }
            () = acquire(&limiter, options.admission) => {}
        }
        metrics.record_wait(started.elapsed());

        tokio::select! {
            biased;
            () = token.cancelled() => {
                metrics.record_drop();
                break;
            }
            sent = stage_in.send(item) => {
                if sent.is_err() {
                    break;
                }
            }
        }
        metrics.record_forward();
    }
}
