// src/dag/mod.rs

//! Action graph construction.
//!
//! - [`graph`] builds a validated scope of action units from config or by
//!   hand, and rejects cycles.
//! - [`lanes`] partitions units into per-lane sequences and chains each lane
//!   into an implicit sequential dependency.

pub mod graph;
pub mod lanes;

pub use graph::{ActionGraph, ActionSet};
pub use lanes::{group_by_lane, group_by_lane_with, LaneMap};
