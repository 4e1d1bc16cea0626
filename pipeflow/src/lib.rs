//! # Pipeflow
//!
//! Composable, concurrent data pipelines on tokio.
//!
//! Pipeflow wires small stages together with bounded handoff queues:
//!
//! - **Stage contract**: every component is a source, a sink or a stage
//!   exposing typed [`Inlet`](core::Inlet)/[`Outlet`](core::Outlet) ends
//! - **Flow orchestration**: a fluent [`Flow`](pipeline::Flow) spawns the
//!   hops between components and honours cooperative cancellation
//! - **Structural combinators**: join, tee, demux, mux and parallelize
//! - **Windowing and throttling**: size/time batching, sliding windows and
//!   rate-limited admission
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipeflow::prelude::*;
//!
//! # async fn run() -> pipeflow::errors::Result<()> {
//! let (sink, collected) = to_vec();
//! from_iter(1..=10)
//!     .thru(map(|i: i32| i * 2))
//!     .thru(batch_n(4))
//!     .to(sink)
//!     .join()
//!     .await?;
//!
//! assert_eq!(collected.wait().await?.len(), 3);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod combinators;
pub mod core;
pub mod endpoints;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod throttle;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancellationToken, StructuredTaskGroup};
    pub use crate::combinators::{branch, demux, fan_in, fan_out, mux, parallelize, Branch, Demux};
    pub use crate::core::{handoff, spawn_stage, Inlet, Outlet, Pipe, Sink, Source, Stage};
    pub use crate::endpoints::{
        for_each, from_channel, from_iter, from_stream, to_channel, to_null, to_vec,
    };
    pub use crate::errors::{ConfigError, PipeflowError};
    pub use crate::observability::{init_tracing, LoggingConfig, StageMetrics};
    pub use crate::pipeline::{join, join_all, Flow, HopReport, Transmission};
    pub use crate::stages::{
        batch, batch_every, batch_n, chunk, drop_if, filter, flat_map, flatten, keep_if, map,
        passthrough, reduce, skip, sliding_window, take, unique, unique_by, BatchOptions,
        SlidingWindowOptions,
    };
    pub use crate::throttle::{
        limit, limit_with_context, throttle, Admission, LimitOptions, RateLimiter, Throttle,
        TokenBucket,
    };
}
