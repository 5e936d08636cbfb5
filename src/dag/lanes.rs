// src/dag/lanes.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::engine::ActionUnit;
use crate::types::LaneId;

/// Per-lane sequences of units, keyed by lane id.
pub type LaneMap = BTreeMap<LaneId, Vec<Arc<ActionUnit>>>;

/// Partition `units` into lanes using [`ActionUnit::lane`].
pub fn group_by_lane(units: &[Arc<ActionUnit>]) -> LaneMap {
    group_by_lane_with(units, |u| u.lane().to_string())
}

/// Partition `units` into lanes, keeping declaration order inside each lane.
///
/// Side effect: every unit gets an implicit zero-interval dependency on its
/// predecessor in the same lane, unless it already depends on it. Applying
/// this twice is a no-op.
pub fn group_by_lane_with<F>(units: &[Arc<ActionUnit>], lane_of: F) -> LaneMap
where
    F: Fn(&ActionUnit) -> LaneId,
{
    let mut lanes = LaneMap::new();

    for unit in units {
        let seq = lanes.entry(lane_of(unit)).or_default();
        if let Some(prev) = seq.last() {
            if !unit.depends_on(prev.id()) {
                trace!(action = %unit.id(), after = %prev.id(), "chaining lane predecessor");
                unit.add_dependency(prev, Duration::ZERO);
            }
        }
        seq.push(Arc::clone(unit));
    }

    lanes
}
