//! Built-in stages.
//!
//! Every constructor here spawns a task and returns a running [`Pipe`].
//! Stages stop as soon as their input closes or their downstream goes away,
//! and close their output when they stop.
//!
//! [`Pipe`]: crate::core::Pipe

mod count;
mod element;
mod window;

pub use count::{skip, take};
pub use element::{
    drop_if, filter, flat_map, flatten, keep_if, map, passthrough, reduce, unique, unique_by,
};
pub use window::{
    batch, batch_every, batch_n, chunk, sliding_window, BatchOptions, SlidingWindowOptions,
};
