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
async fn failure_cancels_transitive_dependents() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("root").lane("1").build(ScriptedPayload::fail(&journal).into_arc()))?;
    graph.add(UnitBuilder::new("mid").lane("2").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.add(UnitBuilder::new("leaf").lane("3").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.add(UnitBuilder::new("free").lane("4").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.depend("mid", "root", Duration::ZERO)?;
    graph.depend("leaf", "mid", Duration::ZERO)?;

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    let report = with_timeout(runtime.run()).await;

    assert!(!report.success);
    for id in ["mid", "leaf"] {
        assert!(runtime.unit(id).unwrap().is_canceled(), "{id} should be canceled");
        assert!(!journal.ran(id), "{id} should not run");
    }
    assert!(!runtime.unit("free").unwrap().is_canceled());
    assert_eq!(report.lanes.get("4"), Some(&true));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cascade_stops_below_a_continue_on_failure_dependent() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("root").lane("1").build(ScriptedPayload::fail(&journal).into_arc()))?;
    graph.add(
        UnitBuilder::new("tolerant")
            .lane("2")
            .continue_on_failure()
            .build(ScriptedPayload::pass(&journal).into_arc()),
    )?;
    graph.add(UnitBuilder::new("below").lane("3").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.depend("tolerant", "root", Duration::ZERO)?;
    graph.depend("below", "tolerant", Duration::ZERO)?;

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    let report = with_timeout(runtime.run()).await;

    // The tolerant dependent is canceled itself, then releases its own
    // dependents as a completion.
    assert!(runtime.unit("tolerant").unwrap().is_canceled());
    assert!(!journal.ran("tolerant"));
    assert!(journal.ran("below"));
    assert_eq!(report.lanes.get("3"), Some(&true));
    assert!(!report.success);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn external_cancel_while_waiting_cascades() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("long").lane("1").build(
        ScriptedPayload::pass(&journal).taking(ms(1_000)).into_arc(),
    ))?;
    graph.add(UnitBuilder::new("waiter").lane("2").build(
        ScriptedPayload::pass(&journal).into_arc(),
    ))?;
    graph.add(UnitBuilder::new("next").lane("3").build(
        ScriptedPayload::pass(&journal).into_arc(),
    ))?;
    graph.depend("waiter", "long", Duration::ZERO)?;
    graph.depend("next", "waiter", Duration::ZERO)?;

    let runtime = Arc::new(Runtime::new(graph.build()?, VariableScope::root()));
    let handle = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.run().await })
    };

    tokio::time::sleep(ms(100)).await;
    runtime.unit("waiter").unwrap().cancel();

    let report = with_timeout(handle).await?;

    assert_eq!(report.lanes.get("1"), Some(&true));
    assert_eq!(report.lanes.get("2"), Some(&false));
    assert_eq!(report.lanes.get("3"), Some(&false));
    assert!(!journal.ran("waiter"));
    assert!(!journal.ran("next"));
    // Cancellation is sticky for the rest of the run.
    assert!(runtime.unit("waiter").unwrap().is_canceled());
    assert!(runtime.unit("next").unwrap().is_canceled());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_during_iteration_fails_the_unit() -> TestResult {
    init_tracing();
    let journal = Journal::new();
    let payload = Arc::new(ScriptedPayload::pass(&journal).taking(ms(200)));

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("busy").build(payload.clone()))?;
    graph.add(UnitBuilder::new("queued").build(ScriptedPayload::pass(&journal).into_arc()))?;

    let runtime = Arc::new(Runtime::new(graph.build()?, VariableScope::root()));
    let handle = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.run().await })
    };

    tokio::time::sleep(ms(50)).await;
    runtime.unit("busy").unwrap().cancel();
    let report = with_timeout(handle).await?;

    // The in-flight iteration is not interrupted, but its result is discarded.
    assert_eq!(journal.count("busy"), 1);
    assert!(!report.success);
    assert!(!journal.ran("queued"));
    assert_eq!(payload.cancel_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reset_clears_cancellation_between_runs() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("A").build(ScriptedPayload::pass(&journal).into_arc()))?;
    let runtime = Runtime::new(graph.build()?, VariableScope::root());

    let unit = Arc::clone(runtime.unit("A").unwrap());
    unit.cancel();
    assert!(unit.is_canceled());

    assert!(with_timeout(runtime.run()).await.success);
    assert!(!unit.is_canceled());
    Ok(())
}
