//! Testing utilities for pipeflow pipelines.
//!
//! This module provides:
//! - Assertions for merged and cut-short outputs
//! - Instrumented stages (delays, probes)

mod assertions;
mod mocks;

pub use assertions::{assert_non_decreasing_by, assert_prefix_of, assert_unordered_eq};
pub use mocks::{delay, probe, stalled, Probe};
