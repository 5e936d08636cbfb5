// src/dag/graph.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::ActionConfig;
use crate::dag::lanes::group_by_lane;
use crate::engine::{ActionUnit, GroupScheduler};
use crate::errors::{HarnessError, Result};
use crate::exec::{Payload, PayloadRegistry};
use crate::types::ActionId;

/// Builder for one scope of actions (the top level or the inside of a
/// group).
///
/// Every mistake that would otherwise show up while running (duplicate ids,
/// dangling dependencies, cycles) is reported here as a configuration error.
#[derive(Debug, Default)]
pub struct ActionGraph {
    units: Vec<Arc<ActionUnit>>,
    index: HashMap<ActionId, usize>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit. Ids must be unique within the graph.
    pub fn add(&mut self, unit: Arc<ActionUnit>) -> Result<Arc<ActionUnit>> {
        if self.index.contains_key(unit.id()) {
            return Err(HarnessError::DuplicateAction(unit.id().to_string()));
        }
        self.index.insert(unit.id().to_string(), self.units.len());
        self.units.push(Arc::clone(&unit));
        Ok(unit)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ActionUnit>> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    /// Declare that `action` waits for `on`, plus `interval` of quiescence.
    pub fn depend(&mut self, action: &str, on: &str, interval: Duration) -> Result<()> {
        if action == on {
            return Err(HarnessError::ConfigError(format!(
                "action '{}' cannot depend on itself",
                action
            )));
        }
        let unit = self.lookup(action, action)?;
        let dependency = self.lookup(action, on)?;
        unit.add_dependency(dependency, interval);
        Ok(())
    }

    fn lookup(&self, action: &str, id: &str) -> Result<&Arc<ActionUnit>> {
        self.get(id).ok_or_else(|| HarnessError::UnknownDependency {
            action: action.to_string(),
            dependency: id.to_string(),
        })
    }

    /// Wire the implicit lane edges and reject dependency cycles.
    pub fn build(self) -> Result<ActionSet> {
        let lanes = group_by_lane(&self.units);
        debug!(
            actions = self.units.len(),
            lanes = lanes.len(),
            "action graph assembled"
        );

        // Edge direction: dependency -> dependent.
        let deps: Vec<(ActionId, Vec<ActionId>)> = self
            .units
            .iter()
            .map(|u| {
                let ids = u.dependencies().into_iter().map(|(id, _)| id).collect();
                (u.id().to_string(), ids)
            })
            .collect();

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (id, _) in &deps {
            graph.add_node(id.as_str());
        }
        for (id, on) in &deps {
            for dep in on {
                graph.add_edge(dep.as_str(), id.as_str(), ());
            }
        }

        // A topological sort will fail if there is a cycle.
        if let Err(cycle) = toposort(&graph, None) {
            return Err(HarnessError::DagCycle(format!(
                "cycle detected in action graph involving action '{}'",
                cycle.node_id()
            )));
        }

        Ok(ActionSet { units: self.units })
    }

    /// Build a validated scope of actions from config, creating payloads
    /// through `registry`. Groups are built recursively.
    pub fn from_config(
        actions: &[ActionConfig],
        default_lane: &str,
        registry: &PayloadRegistry,
    ) -> Result<ActionSet> {
        let mut graph = Self::new();

        for cfg in actions {
            let payload: Arc<dyn Payload> = if cfg.is_group() {
                let nested = Self::from_config(&cfg.actions, default_lane, registry)?;
                Arc::new(GroupScheduler::new(nested))
            } else {
                registry.create(cfg)?
            };
            graph.add(ActionUnit::new(cfg.to_spec(default_lane), payload)?)?;
        }

        for cfg in actions {
            for dep in &cfg.depends_on {
                graph.depend(&cfg.id, dep.id(), dep.interval())?;
            }
        }

        graph.build()
    }
}

/// A validated scope of actions in declaration order.
#[derive(Debug, Clone)]
pub struct ActionSet {
    units: Vec<Arc<ActionUnit>>,
}

impl ActionSet {
    pub fn units(&self) -> &[Arc<ActionUnit>] {
        &self.units
    }

    pub fn into_units(self) -> Vec<Arc<ActionUnit>> {
        self.units
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ActionUnit>> {
        self.units.iter().find(|u| u.id() == id)
    }
}
