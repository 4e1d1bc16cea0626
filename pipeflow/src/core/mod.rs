//! Core stage contract for pipeflow.
//!
//! This module contains the fundamental types every component is built on:
//! - Handoff queues (`Inlet`/`Outlet`)
//! - The `Source`, `Sink` and `Stage` roles
//! - `Pipe`, the running form of a stage

mod contract;
mod handoff;

pub use contract::{spawn_stage, Pipe, Sink, Source, Stage};
pub use handoff::{handoff, handoff_with_capacity, Inlet, Outlet, HANDOFF_CAPACITY};
