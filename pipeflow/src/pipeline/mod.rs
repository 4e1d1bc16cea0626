//! Pipeline assembly.
//!
//! This module provides:
//! - The [`Flow`] orchestrator and its hops
//! - Sequential composition with [`join`] and [`join_all`]

mod flow;
mod join;

pub use flow::{Flow, HopReport, Transmission};
pub use join::{join, join_all};
