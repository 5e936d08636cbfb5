// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{ActionSpec, RepeatPolicy, Value};
use crate::types::DEFAULT_LANE;

/// Suite description as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// default_lane = "main"
///
/// [config.variables]
/// greeting = "hello"
///
/// [[action]]
/// id = "A"
/// type = "command"
/// lane = "1"
/// cmd = "echo ${greeting}"
///
/// [[action]]
/// id = "B"
/// type = "sleep"
/// lane = "1"
/// duration = "100ms"
/// depends_on = [{ id = "A", interval_ms = 50 }]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawSuiteFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: SuiteSection,

    /// All actions from `[[action]]`, in declaration order.
    #[serde(default, rename = "action")]
    pub actions: Vec<ActionConfig>,
}

/// A validated suite description.
///
/// Only obtainable through `TryFrom<RawSuiteFile>` (see `config::validate`).
#[derive(Debug, Clone)]
pub struct SuiteFile {
    pub config: SuiteSection,
    pub actions: Vec<ActionConfig>,
}

impl SuiteFile {
    pub(crate) fn new_unchecked(config: SuiteSection, actions: Vec<ActionConfig>) -> Self {
        Self { config, actions }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteSection {
    /// Lane for actions that do not declare one.
    #[serde(default = "default_lane")]
    pub default_lane: String,

    /// Initial content of the run-wide variable scope.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

fn default_lane() -> String {
    DEFAULT_LANE.to_string()
}

impl Default for SuiteSection {
    fn default() -> Self {
        Self {
            default_lane: default_lane(),
            variables: BTreeMap::new(),
        }
    }
}

/// One `[[action]]` table (or a nested `[[action.actions]]` table of a
/// group).
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    pub id: String,

    /// Payload type, resolved through the payload registry.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub lane: Option<String>,

    #[serde(default)]
    pub depends_on: Vec<DependencyConfig>,

    #[serde(default = "default_repeat")]
    pub repeat: u32,

    #[serde(default)]
    pub expected: Option<u32>,

    #[serde(default)]
    pub atleast: Option<u32>,

    #[serde(default)]
    pub repeat_interval_ms: u64,

    #[serde(default)]
    pub iteration_budget_ms: u64,

    #[serde(default)]
    pub start_after_ms: u64,

    #[serde(default)]
    pub continue_on_failure: bool,

    /// Nested actions; only meaningful for `type = "group"`.
    #[serde(default)]
    pub actions: Vec<ActionConfig>,

    /// Payload-specific keys (`cmd`, `duration`, `name`, ...).
    #[serde(flatten)]
    pub params: toml::Table,
}

fn default_repeat() -> u32 {
    1
}

impl ActionConfig {
    pub fn repeat_policy(&self) -> RepeatPolicy {
        RepeatPolicy {
            repeat: self.repeat,
            expected: self.expected,
            at_least: self.atleast,
            interval: Duration::from_millis(self.repeat_interval_ms),
            iteration_budget: Duration::from_millis(self.iteration_budget_ms),
        }
    }

    /// Engine-side description of this action.
    pub fn to_spec(&self, default_lane: &str) -> ActionSpec {
        let lane = self.lane.as_deref().unwrap_or(default_lane);
        ActionSpec::new(self.id.clone(), lane)
            .policy(self.repeat_policy())
            .continue_on_failure(self.continue_on_failure)
            .start_after(Duration::from_millis(self.start_after_ms))
    }

    pub fn is_group(&self) -> bool {
        self.kind == "group"
    }
}

/// Entry of `depends_on`: either a bare id or `{ id, interval_ms }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DependencyConfig {
    Id(String),
    Detailed {
        id: String,
        #[serde(default)]
        interval_ms: u64,
    },
}

impl DependencyConfig {
    pub fn id(&self) -> &str {
        match self {
            DependencyConfig::Id(id) => id,
            DependencyConfig::Detailed { id, .. } => id,
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            DependencyConfig::Id(_) => Duration::ZERO,
            DependencyConfig::Detailed { interval_ms, .. } => Duration::from_millis(*interval_ms),
        }
    }
}
