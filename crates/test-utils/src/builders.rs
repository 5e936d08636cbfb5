#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actionlane::config::{ActionConfig, DependencyConfig, RawSuiteFile, SuiteFile, SuiteSection};
use actionlane::engine::{ActionSpec, ActionUnit, RepeatPolicy, Value};
use actionlane::exec::Payload;
use actionlane::types::DEFAULT_LANE;

/// Builder for `SuiteFile` to simplify test setup.
pub struct SuiteBuilder {
    suite: RawSuiteFile,
}

impl SuiteBuilder {
    pub fn new() -> Self {
        Self {
            suite: RawSuiteFile {
                config: SuiteSection::default(),
                actions: Vec::new(),
            },
        }
    }

    pub fn with_action(mut self, action: ActionConfig) -> Self {
        self.suite.actions.push(action);
        self
    }

    pub fn default_lane(mut self, lane: &str) -> Self {
        self.suite.config.default_lane = lane.to_string();
        self
    }

    pub fn variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.suite.config.variables.insert(name.to_string(), value.into());
        self
    }

    pub fn raw(self) -> RawSuiteFile {
        self.suite
    }

    pub fn build(self) -> SuiteFile {
        SuiteFile::try_from(self.suite).expect("Failed to build valid suite from builder")
    }
}

impl Default for SuiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ActionConfig`.
pub struct ActionConfigBuilder {
    action: ActionConfig,
}

impl ActionConfigBuilder {
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            action: ActionConfig {
                id: id.to_string(),
                kind: kind.to_string(),
                lane: None,
                depends_on: vec![],
                repeat: 1,
                expected: None,
                atleast: None,
                repeat_interval_ms: 0,
                iteration_budget_ms: 0,
                start_after_ms: 0,
                continue_on_failure: false,
                actions: vec![],
                params: toml::Table::new(),
            },
        }
    }

    pub fn command(id: &str, cmd: &str) -> Self {
        Self::new(id, "command").param("cmd", cmd)
    }

    pub fn group(id: &str) -> Self {
        Self::new(id, "group")
    }

    pub fn lane(mut self, lane: &str) -> Self {
        self.action.lane = Some(lane.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.action.depends_on.push(DependencyConfig::Id(dep.to_string()));
        self
    }

    pub fn after_quiet(mut self, dep: &str, interval_ms: u64) -> Self {
        self.action.depends_on.push(DependencyConfig::Detailed {
            id: dep.to_string(),
            interval_ms,
        });
        self
    }

    pub fn repeat(mut self, n: u32) -> Self {
        self.action.repeat = n;
        self
    }

    pub fn expected(mut self, n: u32) -> Self {
        self.action.expected = Some(n);
        self
    }

    pub fn atleast(mut self, n: u32) -> Self {
        self.action.atleast = Some(n);
        self
    }

    pub fn continue_on_failure(mut self) -> Self {
        self.action.continue_on_failure = true;
        self
    }

    pub fn nested(mut self, action: ActionConfig) -> Self {
        self.action.actions.push(action);
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.action.params.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> ActionConfig {
        self.action
    }
}

/// Builder for hand-wired `ActionUnit`s.
pub struct UnitBuilder {
    spec: ActionSpec,
}

impl UnitBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            spec: ActionSpec::new(id, DEFAULT_LANE),
        }
    }

    pub fn lane(mut self, lane: &str) -> Self {
        self.spec.lane = lane.to_string();
        self
    }

    pub fn policy(mut self, policy: RepeatPolicy) -> Self {
        self.spec.policy = policy;
        self
    }

    pub fn continue_on_failure(mut self) -> Self {
        self.spec.continue_on_failure = true;
        self
    }

    pub fn start_after(mut self, delay: Duration) -> Self {
        self.spec.start_after = delay;
        self
    }

    pub fn build(self, payload: Arc<dyn Payload>) -> Arc<ActionUnit> {
        ActionUnit::new(self.spec, payload).expect("valid repeat policy")
    }
}
