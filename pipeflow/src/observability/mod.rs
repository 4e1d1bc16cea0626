//! Observability utilities.
//!
//! Pipeflow logs through `tracing`; hops, routers and limiters emit records
//! at their concurrency seams. Applications may install their own
//! subscriber or use [`init_tracing`].

mod logging;
mod metrics;

pub use logging::{init_tracing, LoggingConfig};
pub use metrics::StageMetrics;
