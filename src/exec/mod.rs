// src/exec/mod.rs

//! Payload layer.
//!
//! This module is responsible for the work an action actually performs and
//! for turning suite configuration into payload objects.
//!
//! - [`payload`] defines the `Payload` trait the engine runs, plus the
//!   `ActionContext` handed to it.
//! - [`registry`] maps action `type` strings to payload factories.
//! - [`command`] runs shell commands via `tokio::process::Command`.
//! - [`builtin`] holds `sleep`, `set` and `unset`.

pub mod builtin;
pub mod command;
pub mod payload;
pub mod registry;

pub use builtin::{RemoveVariable, SetVariable, SleepPayload};
pub use command::CommandPayload;
pub use payload::{ActionContext, ActionError, BoxFuture, Payload};
pub use registry::{PayloadFactory, PayloadRegistry};
