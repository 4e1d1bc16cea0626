//! Structural combinators: routing, merging and replication.
//!
//! [`Flow::tee`](crate::pipeline::Flow::tee) duplication lives with the
//! orchestrator since it needs the flow's cancellation token.

mod demux;
mod mux;
mod parallelize;

pub use demux::{branch, demux, fan_out, Branch, Demux};
pub use mux::{fan_in, mux};
pub use parallelize::parallelize;
