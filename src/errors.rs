// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Everything here is a *configuration-time* failure. Once an action graph
//! has been built, running it never returns an error: failures are reported
//! as booleans by the engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Duplicate action id: {0}")]
    DuplicateAction(String),

    #[error("action '{action}' depends on unknown action '{dependency}'")]
    UnknownDependency { action: String, dependency: String },

    #[error("Unknown action type '{kind}' for action '{action}'")]
    UnknownActionType { action: String, kind: String },

    #[error("Invalid repeat policy for action '{action}': {reason}")]
    InvalidRepeatPolicy { action: String, reason: String },

    #[error("Cycle detected in action graph: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HarnessError>;
