// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::dag::{group_by_lane, ActionSet};
use crate::engine::lane::run_lane;
use crate::engine::scope::VariableScope;
use crate::engine::unit::ActionUnit;
use crate::types::LaneId;

/// Result of a top-level run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Outcome of every lane that ran.
    pub lanes: BTreeMap<LaneId, bool>,
    /// AND of all lane outcomes; an empty run is successful.
    pub success: bool,
}

/// Top-level scheduler.
///
/// Owns the flat set of top-level actions and the run-wide variable scope.
/// Each call to [`Runtime::run`] resets every unit, starts one Tokio task
/// per lane and joins them all.
#[derive(Debug)]
pub struct Runtime {
    units: Vec<Arc<ActionUnit>>,
    scope: Arc<VariableScope>,
}

impl Runtime {
    pub fn new(actions: ActionSet, scope: Arc<VariableScope>) -> Self {
        Self {
            units: actions.into_units(),
            scope,
        }
    }

    pub fn units(&self) -> &[Arc<ActionUnit>] {
        &self.units
    }

    pub fn unit(&self, id: &str) -> Option<&Arc<ActionUnit>> {
        self.units.iter().find(|u| u.id() == id)
    }

    pub fn scope(&self) -> &Arc<VariableScope> {
        &self.scope
    }

    /// Run every lane to completion.
    pub async fn run(&self) -> RunReport {
        for unit in &self.units {
            unit.reset();
            self.scope
                .register_counter(unit.id(), unit.iteration_counter());
        }

        let lanes = group_by_lane(&self.units);
        info!(actions = self.units.len(), lanes = lanes.len(), "run started");

        let epoch = Instant::now();
        let mut workers = JoinSet::new();
        for (lane, units) in lanes {
            let scope = Arc::clone(&self.scope);
            workers.spawn(async move {
                let passed = run_lane(&lane, units, scope, epoch).await;
                (lane, passed)
            });
        }

        let mut report = RunReport {
            lanes: BTreeMap::new(),
            success: true,
        };
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((lane, passed)) => {
                    debug!(lane = %lane, passed, "lane joined");
                    report.success &= passed;
                    report.lanes.insert(lane, passed);
                }
                Err(e) => {
                    error!(error = %e, "lane worker did not complete");
                    report.success = false;
                }
            }
        }

        if report.success {
            info!(lanes = ?report.lanes, elapsed = ?epoch.elapsed(), "run passed");
        } else {
            warn!(lanes = ?report.lanes, elapsed = ?epoch.elapsed(), "run failed");
        }
        report
    }
}
