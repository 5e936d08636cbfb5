// src/engine/group.rs

//! Composite actions.
//!
//! A `GroupScheduler` is the payload of an action that owns a nested set of
//! actions. Each execution:
//! - resets the nested units and gives them a fresh child variable scope
//! - groups them into lanes and runs every lane on its own Tokio task
//! - waits for all lanes to drain and ANDs their outcomes
//!
//! A failing lane halts the owning action (no further repetitions) but does
//! not touch the other lanes; units there only notice through their own
//! dependency edges. Canceling the owning action cancels every nested unit.
//!
//! The group monitor guards the lane bookkeeping and the handle to the
//! current nested scope. The scope's own entries sit behind the scope's
//! mutex, so payloads can read and write variables without contending with
//! lane completion.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dag::{group_by_lane, ActionSet};
use crate::engine::lane::run_lane;
use crate::engine::scope::VariableScope;
use crate::engine::unit::ActionUnit;
use crate::exec::{ActionContext, ActionError, BoxFuture, Payload};
use crate::types::LaneId;

#[derive(Debug, Default)]
struct GroupState {
    active: BTreeSet<LaneId>,
    outcomes: BTreeMap<LaneId, bool>,
    scope: Option<Arc<VariableScope>>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<GroupState>,
    drained: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, GroupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_lane(&self, lane: LaneId, passed: bool) {
        let empty = {
            let mut state = self.lock();
            state.active.remove(&lane);
            state.outcomes.insert(lane, passed);
            state.active.is_empty()
        };
        if empty {
            self.drained.notify_waiters();
        }
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.lock().active.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug)]
pub struct GroupScheduler {
    units: Vec<Arc<ActionUnit>>,
    shared: Arc<Shared>,
}

impl GroupScheduler {
    pub fn new(actions: ActionSet) -> Self {
        Self {
            units: actions.into_units(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Nested units in declaration order.
    pub fn units(&self) -> &[Arc<ActionUnit>] {
        &self.units
    }

    pub fn unit(&self, id: &str) -> Option<&Arc<ActionUnit>> {
        self.units.iter().find(|u| u.id() == id)
    }

    /// Per-lane outcomes of the latest execution.
    pub fn lane_outcomes(&self) -> BTreeMap<LaneId, bool> {
        self.shared.lock().outcomes.clone()
    }

    /// Nested scope of the latest execution.
    pub fn scope(&self) -> Option<Arc<VariableScope>> {
        self.shared.lock().scope.clone()
    }

    /// Run every nested lane once and aggregate the result.
    pub async fn execute(&self, ctx: &ActionContext) -> bool {
        let group = ctx.action_id().to_string();

        let scope = VariableScope::child(Arc::clone(ctx.scope()));
        for unit in &self.units {
            unit.reset();
            scope.register_counter(unit.id(), unit.iteration_counter());
        }
        scope.register_counter(group.clone(), ctx.unit().iteration_counter());

        // A cancel that landed before the reset above was wiped from the
        // nested units; the owner still carries it.
        if ctx.unit().is_canceled() {
            info!(group = %group, "group canceled before its lanes started");
            self.cancel();
            return false;
        }

        let lanes = group_by_lane(&self.units);
        {
            let mut state = self.shared.lock();
            state.outcomes.clear();
            state.active = lanes.keys().cloned().collect();
            state.scope = Some(Arc::clone(&scope));
        }

        if lanes.is_empty() {
            return true;
        }
        debug!(group = %group, lanes = lanes.len(), "starting group lanes");

        let epoch = Instant::now();
        for (lane, units) in lanes {
            let shared = Arc::clone(&self.shared);
            let scope = Arc::clone(&scope);
            let owner = Arc::clone(ctx.unit());
            let group = group.clone();

            tokio::spawn(async move {
                let passed = run_lane(&lane, units, scope, epoch).await;
                if !passed {
                    warn!(group = %group, lane = %lane, "group lane failed; halting group");
                    owner.halt();
                }
                shared.finish_lane(lane, passed);
            });
        }

        self.shared.wait_drained().await;

        let outcomes = self.lane_outcomes();
        let passed = outcomes.values().all(|ok| *ok);
        info!(group = %group, ?outcomes, passed, "group finished");
        passed
    }
}

impl Payload for GroupScheduler {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<bool, ActionError>> {
        Box::pin(async move { Ok(self.execute(ctx).await) })
    }

    fn cancel(&self) {
        for unit in &self.units {
            unit.cancel();
        }
    }

    fn children(&self) -> &[Arc<ActionUnit>] {
        &self.units
    }
}
