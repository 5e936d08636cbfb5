// src/exec/registry.rs

//! Maps the `type` of an action to a payload factory.
//!
//! The engine itself has no knowledge of concrete payload kinds. A registry
//! is built once per run and handed to the graph builder; callers can add
//! their own kinds next to the built-in ones.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::model::ActionConfig;
use crate::errors::{HarnessError, Result};
use crate::exec::builtin::{RemoveVariable, SetVariable, SleepPayload};
use crate::exec::command::CommandPayload;
use crate::exec::payload::Payload;

pub type PayloadFactory = Box<dyn Fn(&ActionConfig) -> Result<Arc<dyn Payload>> + Send + Sync>;

#[derive(Default)]
pub struct PayloadRegistry {
    factories: BTreeMap<String, PayloadFactory>,
}

impl fmt::Debug for PayloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl PayloadRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `command`, `sleep`, `set` and `unset`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("command", |cfg| {
            Ok(Arc::new(CommandPayload::from_config(cfg)?) as Arc<dyn Payload>)
        });
        registry.register("sleep", |cfg| {
            Ok(Arc::new(SleepPayload::from_config(cfg)?) as Arc<dyn Payload>)
        });
        registry.register("set", |cfg| {
            Ok(Arc::new(SetVariable::from_config(cfg)?) as Arc<dyn Payload>)
        });
        registry.register("unset", |cfg| {
            Ok(Arc::new(RemoveVariable::from_config(cfg)?) as Arc<dyn Payload>)
        });
        registry
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&ActionConfig) -> Result<Arc<dyn Payload>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Create the payload for `cfg`.
    pub fn create(&self, cfg: &ActionConfig) -> Result<Arc<dyn Payload>> {
        let factory = self
            .factories
            .get(&cfg.kind)
            .ok_or_else(|| HarnessError::UnknownActionType {
                action: cfg.id.clone(),
                kind: cfg.kind.clone(),
            })?;
        factory(cfg)
    }
}

/// String parameter `key` of `cfg`, or a missing-field configuration error.
pub fn required_str<'a>(cfg: &'a ActionConfig, key: &str) -> Result<&'a str> {
    optional_str(cfg, key)?.ok_or_else(|| {
        HarnessError::ConfigError(format!(
            "action '{}' of type '{}' is missing required field '{}'",
            cfg.id, cfg.kind, key
        ))
    })
}

/// String parameter `key` of `cfg` if present.
pub fn optional_str<'a>(cfg: &'a ActionConfig, key: &str) -> Result<Option<&'a str>> {
    match cfg.params.get(key) {
        None => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(HarnessError::ConfigError(format!(
            "action '{}': field '{}' must be a string (got {})",
            cfg.id,
            key,
            other.type_str()
        ))),
    }
}
