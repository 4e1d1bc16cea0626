//! Cooperative cancellation and task tracking.
//!
//! This module provides:
//! - CancellationToken, the one-way signal every hop observes
//! - StructuredTaskGroup for joining the tasks a combinator spawns

mod task_group;
mod token;

pub use task_group::StructuredTaskGroup;
pub use token::{CancelCallback, CancellationToken};
