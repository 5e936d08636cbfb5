// src/engine/unit.rs

//! The schedulable action unit.
//!
//! An `ActionUnit` owns:
//! - its dependency trackers (explicit edges plus the implicit edge to the
//!   previous unit on the same lane)
//! - the reverse edges (`dependents`) it must notify or cancel when it ends
//! - its repetition policy and per-run state (canceled flag, iteration
//!   counter)
//!
//! `execute` waits for dependencies, runs the payload as often as the policy
//! says, checks the post-condition and finally propagates the outcome to the
//! dependents. It never fails: every problem ends up as `false`.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::engine::scope::VariableScope;
use crate::engine::tracker::CompletionTracker;
use crate::errors::{HarnessError, Result};
use crate::exec::{ActionContext, Payload};
use crate::types::{ActionId, LaneId};

/// Shortest nap while waiting for a dependency's quiescence interval.
const MIN_WAIT: Duration = Duration::from_millis(5);

/// Longest nap before re-checking dependencies and cancellation.
const RECHECK_INTERVAL: Duration = Duration::from_millis(50);

/// How often an action runs and which failures it tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatPolicy {
    /// Upper bound on iterations.
    pub repeat: u32,
    /// The payload is expected to pass exactly this many times and then fail
    /// on the following iteration.
    pub expected: Option<u32>,
    /// Failures are tolerated once this many iterations have executed; at
    /// least this many must pass overall.
    pub at_least: Option<u32>,
    /// Cadence between iteration starts.
    pub interval: Duration,
    /// Settle time after a passing iteration.
    pub iteration_budget: Duration,
}

/// What a failed iteration means for the rest of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureVerdict {
    /// The failure marks the expected end of the sequence; stop iterating.
    ExpectedEnd,
    /// Tolerated; keep iterating.
    Tolerated,
    /// Not tolerated; the action fails.
    Fatal,
}

impl Default for RepeatPolicy {
    fn default() -> Self {
        Self::once()
    }
}

impl RepeatPolicy {
    pub fn once() -> Self {
        Self::times(1)
    }

    pub fn times(repeat: u32) -> Self {
        Self {
            repeat,
            expected: None,
            at_least: None,
            interval: Duration::ZERO,
            iteration_budget: Duration::ZERO,
        }
    }

    pub fn expected(mut self, n: u32) -> Self {
        self.expected = Some(n);
        self
    }

    pub fn at_least(mut self, n: u32) -> Self {
        self.at_least = Some(n);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn iteration_budget(mut self, budget: Duration) -> Self {
        self.iteration_budget = budget;
        self
    }

    /// Check the policy's invariants for the action `action`.
    pub fn validate(&self, action: &str) -> Result<()> {
        let invalid = |reason: String| HarnessError::InvalidRepeatPolicy {
            action: action.to_string(),
            reason,
        };

        if self.repeat == 0 {
            return Err(invalid("repeat must be at least 1".to_string()));
        }
        if let Some(expected) = self.expected {
            if self.repeat <= expected {
                return Err(invalid(format!(
                    "repeat ({}) must exceed expected ({})",
                    self.repeat, expected
                )));
            }
            if let Some(at_least) = self.at_least {
                if self.repeat <= at_least {
                    return Err(invalid(format!(
                        "repeat ({}) must exceed atleast ({})",
                        self.repeat, at_least
                    )));
                }
            }
        }
        Ok(())
    }

    /// Decide what a failure of iteration `index` means, `executed` being the
    /// number of iterations run so far (including this one).
    pub fn judge_failure(&self, index: u32, executed: u32) -> FailureVerdict {
        if self.expected == Some(index) {
            FailureVerdict::ExpectedEnd
        } else if self.at_least.is_some_and(|n| executed >= n) {
            FailureVerdict::Tolerated
        } else {
            FailureVerdict::Fatal
        }
    }

    /// Post-condition once iteration has stopped.
    pub fn is_satisfied(&self, executed: u32, passed: u32) -> bool {
        match (self.expected, self.at_least) {
            (Some(expected), _) => passed == expected,
            (None, Some(at_least)) => passed >= at_least,
            // A single-shot action skips the count check.
            (None, None) => !(self.repeat > 1 && executed < self.repeat),
        }
    }
}

/// Static description of an action unit.
#[derive(Debug, Clone)]
pub struct ActionSpec {
    pub id: ActionId,
    pub lane: LaneId,
    pub policy: RepeatPolicy,
    pub continue_on_failure: bool,
    /// Delay of the first iteration, relative to the enclosing run's epoch.
    pub start_after: Duration,
}

impl ActionSpec {
    pub fn new(id: impl Into<ActionId>, lane: impl Into<LaneId>) -> Self {
        Self {
            id: id.into(),
            lane: lane.into(),
            policy: RepeatPolicy::once(),
            continue_on_failure: false,
            start_after: Duration::ZERO,
        }
    }

    pub fn policy(mut self, policy: RepeatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn continue_on_failure(mut self, yes: bool) -> Self {
        self.continue_on_failure = yes;
        self
    }

    pub fn start_after(mut self, delay: Duration) -> Self {
        self.start_after = delay;
        self
    }
}

#[derive(Debug, Default)]
struct UnitState {
    canceled: bool,
    depends_on: BTreeMap<ActionId, CompletionTracker>,
}

impl UnitState {
    /// Longest remaining wait over all dependencies; `None` while any of them
    /// has not completed.
    fn longest_wait(&self, now: Instant) -> Option<Duration> {
        let mut longest = Duration::ZERO;
        for tracker in self.depends_on.values() {
            longest = longest.max(tracker.time_to_wait(now)?);
        }
        Some(longest)
    }
}

pub struct ActionUnit {
    spec: ActionSpec,
    payload: Arc<dyn Payload>,
    state: Mutex<UnitState>,
    wake: Notify,
    iterations: Arc<AtomicU64>,
    dependents: Mutex<Vec<Arc<ActionUnit>>>,
}

impl fmt::Debug for ActionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionUnit")
            .field("id", &self.spec.id)
            .field("lane", &self.spec.lane)
            .field("policy", &self.spec.policy)
            .field("iterations", &self.iterations())
            .field("canceled", &self.is_canceled())
            .finish_non_exhaustive()
    }
}

impl ActionUnit {
    /// Create a unit, rejecting an invalid repeat policy.
    pub fn new(spec: ActionSpec, payload: Arc<dyn Payload>) -> Result<Arc<Self>> {
        spec.policy.validate(&spec.id)?;
        Ok(Arc::new(Self {
            spec,
            payload,
            state: Mutex::new(UnitState::default()),
            wake: Notify::new(),
            iterations: Arc::new(AtomicU64::new(0)),
            dependents: Mutex::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn lane(&self) -> &str {
        &self.spec.lane
    }

    pub fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    pub fn policy(&self) -> &RepeatPolicy {
        &self.spec.policy
    }

    pub fn continues_on_failure(&self) -> bool {
        self.spec.continue_on_failure
    }

    pub fn payload(&self) -> &Arc<dyn Payload> {
        &self.payload
    }

    /// Iterations executed in the current run.
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    /// Shared handle to the iteration counter, for registration in a scope.
    pub fn iteration_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.iterations)
    }

    pub fn is_canceled(&self) -> bool {
        self.lock_state().canceled
    }

    /// Dependencies as `(id, required interval)` pairs.
    pub fn dependencies(&self) -> Vec<(ActionId, Duration)> {
        self.lock_state()
            .depends_on
            .iter()
            .map(|(id, t)| (id.clone(), t.required_interval()))
            .collect()
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.lock_state().depends_on.contains_key(id)
    }

    pub fn dependent_ids(&self) -> Vec<ActionId> {
        self.lock_dependents()
            .iter()
            .map(|d| d.id().to_string())
            .collect()
    }

    /// Make `self` wait for `dependency`, with `interval` of quiescence after
    /// each of its completions. Re-declaring an edge replaces its interval.
    pub fn add_dependency(self: &Arc<Self>, dependency: &Arc<ActionUnit>, interval: Duration) {
        self.lock_state()
            .depends_on
            .insert(dependency.id().to_string(), CompletionTracker::new(interval));

        let mut dependents = dependency.lock_dependents();
        if !dependents.iter().any(|d| Arc::ptr_eq(d, self)) {
            dependents.push(Arc::clone(self));
        }
    }

    /// Prepare for a new run.
    pub fn reset(&self) {
        {
            let mut state = self.lock_state();
            state.canceled = false;
            for tracker in state.depends_on.values_mut() {
                tracker.reset();
            }
        }
        self.iterations.store(0, Ordering::SeqCst);
    }

    /// Cancel this unit: stop waiting, run no further iterations, and let the
    /// payload cancel whatever it owns.
    pub fn cancel(&self) {
        if self.mark_canceled() {
            debug!(action = %self.spec.id, "action canceled");
        }
        self.payload.cancel();
    }

    /// Set the canceled flag without forwarding to the payload.
    pub(crate) fn halt(&self) {
        self.mark_canceled();
    }

    /// Give up on a unit that will never be executed in this run: cancel it
    /// and settle its dependents as a failed completion would.
    pub fn abandon(&self) {
        self.cancel();
        self.propagate(false);
    }

    /// Run this unit to completion for the current run.
    ///
    /// `scope` and `epoch` belong to the enclosing scheduler.
    pub async fn execute(self: &Arc<Self>, scope: Arc<VariableScope>, epoch: Instant) -> bool {
        let id = &self.spec.id;
        debug!(action = %id, lane = %self.spec.lane, "waiting for dependencies");

        let passed = if self.await_dependencies().await {
            self.iterate(&scope, epoch).await
        } else {
            info!(action = %id, "canceled while waiting for dependencies");
            false
        };
        let passed = passed && !self.is_canceled();

        self.propagate(passed);

        if passed {
            info!(action = %id, iterations = self.iterations(), "action passed");
        } else {
            warn!(
                action = %id,
                iterations = self.iterations(),
                canceled = self.is_canceled(),
                "action failed"
            );
        }
        passed
    }

    async fn await_dependencies(&self) -> bool {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let pending = {
                let state = self.lock_state();
                if state.canceled {
                    return false;
                }
                state.longest_wait(Instant::now())
            };

            let nap = match pending {
                Some(wait) if wait.is_zero() => return true,
                Some(wait) => wait.clamp(MIN_WAIT, RECHECK_INTERVAL),
                None => RECHECK_INTERVAL,
            };
            let _ = timeout(nap, notified).await;
        }
    }

    /// Sleep until `deadline`; `false` if canceled first.
    async fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            let notified = self.wake.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_canceled() {
                return false;
            }
            if Instant::now() >= deadline {
                return true;
            }
            let _ = timeout_at(deadline, notified).await;
        }
    }

    async fn iterate(self: &Arc<Self>, scope: &Arc<VariableScope>, epoch: Instant) -> bool {
        let id = &self.spec.id;
        let policy = self.spec.policy;
        let mut next_start = epoch + self.spec.start_after;
        let mut executed: u32 = 0;
        let mut passed: u32 = 0;

        for index in 0..policy.repeat {
            if !self.sleep_until(next_start).await {
                info!(action = %id, iteration = index, "canceled before iteration");
                return false;
            }

            next_start = Instant::now() + policy.interval;
            self.iterations.fetch_add(1, Ordering::SeqCst);
            executed += 1;

            let ctx = ActionContext::new(Arc::clone(self), Arc::clone(scope), index);
            if self.run_payload(ctx).await {
                passed += 1;
                next_start = next_start.max(Instant::now() + policy.iteration_budget);
                continue;
            }

            match policy.judge_failure(index, executed) {
                FailureVerdict::ExpectedEnd => {
                    debug!(action = %id, iteration = index, "failure at expected iteration; stopping");
                    break;
                }
                FailureVerdict::Tolerated => {
                    debug!(action = %id, iteration = index, "failure tolerated; continuing");
                }
                FailureVerdict::Fatal => {
                    warn!(action = %id, iteration = index, "iteration failed");
                    return false;
                }
            }
        }

        let satisfied = policy.is_satisfied(executed, passed);
        if !satisfied {
            warn!(
                action = %id,
                executed,
                passed,
                repeat = policy.repeat,
                expected = ?policy.expected,
                atleast = ?policy.at_least,
                "iteration count does not satisfy repeat policy"
            );
        }
        satisfied
    }

    /// Run one iteration of the payload in its own task so that errors and
    /// panics end up as a plain failure.
    async fn run_payload(&self, ctx: ActionContext) -> bool {
        let id = &self.spec.id;
        let iteration = ctx.iteration();
        let payload = Arc::clone(&self.payload);

        match tokio::spawn(async move { payload.run(&ctx).await }).await {
            Ok(Ok(passed)) => passed,
            Ok(Err(err)) if err.is_recoverable() => {
                warn!(action = %id, iteration, error = %err, "payload reported failure");
                false
            }
            Ok(Err(err)) => {
                error!(action = %id, iteration, error = ?err, "payload error");
                false
            }
            Err(join_err) => {
                error!(action = %id, iteration, error = %join_err, "payload task did not complete");
                false
            }
        }
    }

    /// Release or cancel the dependents once this unit is done.
    fn propagate(&self, passed: bool) {
        let dependents = self.lock_dependents().clone();
        if dependents.is_empty() {
            return;
        }

        if !passed && !self.spec.continue_on_failure {
            info!(
                action = %self.spec.id,
                dependents = ?self.dependent_ids(),
                "canceling dependents"
            );
            self.cancel_dependents();
            return;
        }

        let now = Instant::now();
        for dependent in dependents {
            dependent.dependency_completed(&self.spec.id, now);
        }
    }

    /// Depth-first cancellation of the dependent graph. Dependents that
    /// continue on failure are canceled themselves but release their own
    /// dependents when they finish.
    fn cancel_dependents(&self) {
        let mut stack: Vec<Arc<ActionUnit>> = self.lock_dependents().iter().rev().cloned().collect();
        let mut seen: HashSet<*const ActionUnit> = HashSet::new();

        while let Some(unit) = stack.pop() {
            if !seen.insert(Arc::as_ptr(&unit)) {
                continue;
            }
            unit.cancel();
            if !unit.spec.continue_on_failure {
                stack.extend(unit.lock_dependents().iter().rev().cloned());
            }
        }
    }

    fn dependency_completed(&self, dependency: &str, at: Instant) {
        {
            let mut state = self.lock_state();
            if let Some(tracker) = state.depends_on.get_mut(dependency) {
                tracker.record_completion(at);
            }
        }
        self.wake.notify_waiters();
    }

    /// Returns `true` if the flag was newly set.
    fn mark_canceled(&self) -> bool {
        let newly = {
            let mut state = self.lock_state();
            !std::mem::replace(&mut state.canceled, true)
        };
        self.wake.notify_waiters();
        newly
    }

    fn lock_state(&self) -> MutexGuard<'_, UnitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_dependents(&self) -> MutexGuard<'_, Vec<Arc<ActionUnit>>> {
        self.dependents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
