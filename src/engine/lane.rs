// src/engine/lane.rs

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::engine::scope::VariableScope;
use crate::engine::unit::ActionUnit;

/// Run one lane: execute its units strictly in order.
///
/// The first unit that returns `false` stops the lane. Units still queued
/// behind it are abandoned (canceled, dependents settled) and never run.
/// Returns whether every unit passed.
pub async fn run_lane(
    lane: &str,
    units: Vec<Arc<ActionUnit>>,
    scope: Arc<VariableScope>,
    epoch: Instant,
) -> bool {
    let mut queue: VecDeque<Arc<ActionUnit>> = units.into();
    debug!(lane, actions = queue.len(), "lane worker started");

    while let Some(unit) = queue.pop_front() {
        if unit.execute(Arc::clone(&scope), epoch).await {
            continue;
        }

        if !queue.is_empty() {
            let skipped: Vec<&str> = queue.iter().map(|u| u.id()).collect();
            info!(lane, failed = %unit.id(), ?skipped, "lane stopped; remaining actions will not run");
        }
        for rest in queue.drain(..) {
            rest.abandon();
        }
        return false;
    }

    debug!(lane, "lane worker finished");
    true
}
