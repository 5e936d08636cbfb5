// src/exec/builtin.rs

//! Small built-in payloads that need no external tooling.

use std::time::Duration;

use tracing::debug;

use crate::config::model::ActionConfig;
use crate::engine::Value;
use crate::errors::{self, HarnessError};
use crate::exec::payload::{ActionContext, ActionError, BoxFuture, Payload};
use crate::exec::registry::required_str;
use crate::types::parse_duration;

/// `type = "sleep"`: wait for `duration`, then pass.
#[derive(Debug, Clone)]
pub struct SleepPayload {
    duration: Duration,
}

impl SleepPayload {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_config(cfg: &ActionConfig) -> errors::Result<Self> {
        let raw = required_str(cfg, "duration")?;
        let duration = parse_duration(raw).map_err(|e| {
            HarnessError::ConfigError(format!("action '{}': invalid duration: {}", cfg.id, e))
        })?;
        Ok(Self::new(duration))
    }
}

impl Payload for SleepPayload {
    fn run<'a>(&'a self, _ctx: &'a ActionContext) -> BoxFuture<'a, Result<bool, ActionError>> {
        Box::pin(async move {
            tokio::time::sleep(self.duration).await;
            Ok(true)
        })
    }
}

/// `type = "set"`: store `value` under `name` in the enclosing scope.
#[derive(Debug, Clone)]
pub struct SetVariable {
    name: String,
    value: Value,
}

impl SetVariable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn from_config(cfg: &ActionConfig) -> errors::Result<Self> {
        let name = required_str(cfg, "name")?;
        let value = cfg.params.get("value").cloned().ok_or_else(|| {
            HarnessError::ConfigError(format!(
                "action '{}' of type 'set' is missing required field 'value'",
                cfg.id
            ))
        })?;
        Ok(Self::new(name, value))
    }
}

impl Payload for SetVariable {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<bool, ActionError>> {
        Box::pin(async move {
            debug!(action = %ctx.action_id(), name = %self.name, "setting variable");
            ctx.scope().set(self.name.clone(), Some(self.value.clone()));
            Ok(true)
        })
    }
}

/// `type = "unset"`: remove `name` from the enclosing scope. Fails if the
/// variable was not set there.
#[derive(Debug, Clone)]
pub struct RemoveVariable {
    name: String,
}

impl RemoveVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn from_config(cfg: &ActionConfig) -> errors::Result<Self> {
        Ok(Self::new(required_str(cfg, "name")?))
    }
}

impl Payload for RemoveVariable {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<bool, ActionError>> {
        Box::pin(async move {
            match ctx.scope().remove(&self.name) {
                Some(_) => Ok(true),
                None => Err(ActionError::recoverable(format!(
                    "variable '{}' is not set in this scope",
                    self.name
                ))),
            }
        })
    }
}
