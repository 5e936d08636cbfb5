use std::sync::Arc;
use std::time::Duration;

use actionlane::dag::group_by_lane;
use actionlane::engine::ActionUnit;
use actionlane_test_utils::builders::UnitBuilder;
use actionlane_test_utils::scripted::{Journal, ScriptedPayload};
use proptest::prelude::*;

// Units named `u{i}` with lanes drawn from a small pool so lanes collide.
fn units_strategy(max_units: usize) -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(0..4usize, 0..=max_units)
}

fn build_units(lanes: &[usize]) -> Vec<Arc<ActionUnit>> {
    let journal = Journal::new();
    lanes
        .iter()
        .enumerate()
        .map(|(i, lane)| {
            UnitBuilder::new(&format!("u{i}"))
                .lane(&format!("lane{lane}"))
                .build(ScriptedPayload::pass(&journal).into_arc())
        })
        .collect()
}

proptest! {
    #[test]
    fn lanes_keep_declaration_order(lanes in units_strategy(24)) {
        let units = build_units(&lanes);
        let grouped = group_by_lane(&units);

        let total: usize = grouped.values().map(Vec::len).sum();
        prop_assert_eq!(total, units.len());

        for (lane, seq) in &grouped {
            let expected: Vec<&str> = units
                .iter()
                .filter(|u| u.lane() == lane)
                .map(|u| u.id())
                .collect();
            let actual: Vec<&str> = seq.iter().map(|u| u.id()).collect();
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn each_unit_waits_for_its_lane_predecessor(lanes in units_strategy(24)) {
        let units = build_units(&lanes);
        let grouped = group_by_lane(&units);

        for seq in grouped.values() {
            prop_assert!(seq[0].dependencies().is_empty());
            for pair in seq.windows(2) {
                prop_assert_eq!(
                    pair[1].dependencies(),
                    vec![(pair[0].id().to_string(), Duration::ZERO)]
                );
                prop_assert!(pair[0].dependent_ids().contains(&pair[1].id().to_string()));
            }
        }
    }

    #[test]
    fn grouping_twice_adds_no_edges(lanes in units_strategy(24)) {
        let units = build_units(&lanes);
        let _ = group_by_lane(&units);
        let before: Vec<_> = units.iter().map(|u| (u.dependencies(), u.dependent_ids())).collect();

        let _ = group_by_lane(&units);
        let after: Vec<_> = units.iter().map(|u| (u.dependencies(), u.dependent_ids())).collect();
        prop_assert_eq!(before, after);
    }
}
