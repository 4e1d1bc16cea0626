//! Sources and sinks at the ends of a flow.

mod sink;
mod source;

pub use sink::{for_each, to_channel, to_null, to_vec, Collected, Completion, Drained, TaskSink};
pub use source::{from_channel, from_iter, from_stream};
