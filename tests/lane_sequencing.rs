use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use actionlane::dag::ActionGraph;
use actionlane::engine::{Runtime, VariableScope};
use actionlane_test_utils::builders::UnitBuilder;
use actionlane_test_utils::scripted::{Journal, ScriptedPayload};
use actionlane_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn units_on_one_lane_run_in_declaration_order() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("A").lane("1").build(
        ScriptedPayload::pass(&journal).taking(ms(20)).into_arc(),
    ))?;
    graph.add(UnitBuilder::new("B").lane("1").build(
        ScriptedPayload::pass(&journal).taking(ms(20)).into_arc(),
    ))?;
    graph.depend("B", "A", Duration::ZERO)?;

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    let report = with_timeout(runtime.run()).await;

    assert!(report.success);
    assert_eq!(report.lanes.get("1"), Some(&true));
    assert_eq!(journal.order(), vec!["A", "B"]);
    assert!(journal.first_start("B").unwrap() >= journal.last_finish("A").unwrap());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn later_units_never_overlap_their_predecessor() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    for (id, took) in [("a", 30), ("b", 5), ("c", 50), ("d", 0)] {
        graph.add(UnitBuilder::new(id).build(
            ScriptedPayload::pass(&journal).taking(ms(took)).into_arc(),
        ))?;
    }

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    assert!(with_timeout(runtime.run()).await.success);

    assert_eq!(journal.order(), vec!["a", "b", "c", "d"]);
    for pair in ["a", "b", "c", "d"].windows(2) {
        assert!(journal.first_start(pair[1]).unwrap() >= journal.last_finish(pair[0]).unwrap());
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failure_stops_the_lane_and_skips_queued_units() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("A").lane("1").build(ScriptedPayload::fail(&journal).into_arc()))?;
    graph.add(UnitBuilder::new("B").lane("1").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.add(UnitBuilder::new("C").lane("2").build(ScriptedPayload::pass(&journal).into_arc()))?;

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    let report = with_timeout(runtime.run()).await;

    assert!(!report.success);
    assert_eq!(report.lanes.get("1"), Some(&false));
    assert_eq!(report.lanes.get("2"), Some(&true));
    assert!(journal.ran("A"));
    assert!(!journal.ran("B"));
    assert!(journal.ran("C"));
    assert!(runtime.unit("B").unwrap().is_canceled());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn lanes_run_concurrently() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("X").lane("x").build(
        ScriptedPayload::pass(&journal).taking(ms(100)).into_arc(),
    ))?;
    graph.add(UnitBuilder::new("Y").lane("y").build(
        ScriptedPayload::pass(&journal).taking(ms(100)).into_arc(),
    ))?;

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    let started = tokio::time::Instant::now();
    assert!(with_timeout(runtime.run()).await.success);

    assert_eq!(journal.first_start("X"), journal.first_start("Y"));
    assert!(started.elapsed() < ms(200));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn skipped_units_release_cross_lane_dependents() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("A").lane("1").build(ScriptedPayload::fail(&journal).into_arc()))?;
    graph.add(UnitBuilder::new("B").lane("1").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.add(UnitBuilder::new("C").lane("2").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.depend("C", "B", Duration::ZERO)?;

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    let report = with_timeout(runtime.run()).await;

    assert!(!report.success);
    assert_eq!(report.lanes.get("2"), Some(&false));
    assert!(!journal.ran("C"));
    assert!(runtime.unit("C").unwrap().is_canceled());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn runtime_can_be_run_again() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("A").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.add(UnitBuilder::new("B").build(ScriptedPayload::pass(&journal).into_arc()))?;

    let runtime = Arc::new(Runtime::new(graph.build()?, VariableScope::root()));
    assert!(with_timeout(runtime.run()).await.success);
    assert!(with_timeout(runtime.run()).await.success);

    assert_eq!(journal.count("A"), 2);
    assert_eq!(journal.count("B"), 2);
    assert_eq!(runtime.scope().counter("A"), Some(1));
    Ok(())
}
