// src/engine/mod.rs

//! Action scheduling and execution engine.
//!
//! - [`unit`]: the schedulable action, its repeat policy and lifecycle.
//! - [`tracker`]: per-dependency completion bookkeeping.
//! - [`lane`]: the sequential worker loop shared by both schedulers.
//! - [`group`]: composite actions scheduling a nested set of actions.
//! - [`runtime`]: the top-level scheduler.
//! - [`scope`]: variable scopes with parent fallback.

pub mod group;
pub mod lane;
pub mod runtime;
pub mod scope;
pub mod tracker;
pub mod unit;

pub use group::GroupScheduler;
pub use lane::run_lane;
pub use runtime::{RunReport, Runtime};
pub use scope::{Value, VariableScope};
pub use tracker::CompletionTracker;
pub use unit::{ActionSpec, ActionUnit, FailureVerdict, RepeatPolicy};
