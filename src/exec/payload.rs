// src/exec/payload.rs

//! Payload abstraction.
//!
//! The engine never knows what an action actually *does*. It talks to a
//! `Payload` instead, the same way the scheduler talks to an executor
//! backend: production code registers concrete payloads through
//! [`PayloadRegistry`](super::PayloadRegistry), tests provide scripted fakes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::engine::{ActionUnit, VariableScope};

/// Boxed future returned by payloads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors a payload may raise from `run`.
///
/// Both kinds are caught at the action boundary and turned into a failed
/// iteration; the distinction only affects how loudly it is logged.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Expected, recoverable failure (bad output, missing variable, ...).
    #[error("{0}")]
    Recoverable(String),

    /// Anything else.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl ActionError {
    pub fn recoverable(msg: impl Into<String>) -> Self {
        ActionError::Recoverable(msg.into())
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, ActionError::Recoverable(_))
    }
}

/// A unit of work executed once per iteration of an action.
pub trait Payload: Send + Sync {
    /// Run one iteration. `Ok(true)` is a pass, `Ok(false)` a failure.
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<bool, ActionError>>;

    /// Called when the owning action is canceled. Composite payloads forward
    /// the cancellation to whatever they own.
    fn cancel(&self) {}

    /// Actions owned by a composite payload.
    fn children(&self) -> &[Arc<ActionUnit>] {
        &[]
    }
}

/// Everything a payload can see while it runs.
///
/// Cheap to clone: all fields are shared handles.
#[derive(Clone)]
pub struct ActionContext {
    unit: Arc<ActionUnit>,
    scope: Arc<VariableScope>,
    iteration: u32,
}

impl ActionContext {
    pub(crate) fn new(
        unit: Arc<ActionUnit>,
        scope: Arc<VariableScope>,
        iteration: u32,
    ) -> Self {
        Self {
            unit,
            scope,
            iteration,
        }
    }

    pub fn action_id(&self) -> &str {
        self.unit.id()
    }

    /// The action this payload belongs to.
    pub fn unit(&self) -> &Arc<ActionUnit> {
        &self.unit
    }

    /// Variable scope of the enclosing scheduler.
    pub fn scope(&self) -> &Arc<VariableScope> {
        &self.scope
    }

    /// Zero-based index of the current iteration.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("action", &self.unit.id())
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}
