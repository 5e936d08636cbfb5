use std::error::Error;
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
async fn dependent_waits_for_quiescence_interval() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("boot").lane("server").build(
        ScriptedPayload::pass(&journal).taking(ms(40)).into_arc(),
    ))?;
    graph.add(UnitBuilder::new("probe").lane("client").build(
        ScriptedPayload::pass(&journal).into_arc(),
    ))?;
    graph.depend("probe", "boot", ms(250))?;

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    assert!(with_timeout(runtime.run()).await.success);

    let done = journal.last_finish("boot").unwrap();
    let start = journal.first_start("probe").unwrap();
    assert!(start >= done + ms(250), "probe started {:?} after boot", start - done);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dependent_waits_for_the_slowest_dependency() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("fast").lane("a").build(
        ScriptedPayload::pass(&journal).taking(ms(10)).into_arc(),
    ))?;
    graph.add(UnitBuilder::new("slow").lane("b").build(
        ScriptedPayload::pass(&journal).taking(ms(300)).into_arc(),
    ))?;
    graph.add(UnitBuilder::new("join").lane("c").build(
        ScriptedPayload::pass(&journal).into_arc(),
    ))?;
    graph.depend("join", "fast", ms(100))?;
    graph.depend("join", "slow", ms(20))?;

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    assert!(with_timeout(runtime.run()).await.success);

    let start = journal.first_start("join").unwrap();
    assert!(start >= journal.last_finish("fast").unwrap() + ms(100));
    assert!(start >= journal.last_finish("slow").unwrap() + ms(20));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn explicit_edge_on_lane_predecessor_keeps_its_interval() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(UnitBuilder::new("A").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.add(UnitBuilder::new("B").build(ScriptedPayload::pass(&journal).into_arc()))?;
    graph.depend("B", "A", ms(120))?;
    let actions = graph.build()?;

    let b = actions.get("B").unwrap();
    assert_eq!(b.dependencies(), vec![("A".to_string(), ms(120))]);

    let runtime = Runtime::new(actions, VariableScope::root());
    assert!(with_timeout(runtime.run()).await.success);
    assert!(journal.first_start("B").unwrap() >= journal.last_finish("A").unwrap() + ms(120));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn continue_on_failure_releases_dependents() -> TestResult {
    init_tracing();
    let journal = Journal::new();

    let mut graph = ActionGraph::new();
    graph.add(
        UnitBuilder::new("flaky")
            .lane("1")
            .continue_on_failure()
            .build(ScriptedPayload::fail(&journal).into_arc()),
    )?;
    graph.add(UnitBuilder::new("after").lane("2").build(
        ScriptedPayload::pass(&journal).into_arc(),
    ))?;
    graph.depend("after", "flaky", ms(50))?;

    let runtime = Runtime::new(graph.build()?, VariableScope::root());
    let report = with_timeout(runtime.run()).await;

    assert!(!report.success);
    assert_eq!(report.lanes.get("1"), Some(&false));
    assert_eq!(report.lanes.get("2"), Some(&true));
    assert!(journal.first_start("after").unwrap() >= journal.last_finish("flaky").unwrap() + ms(50));
    Ok(())
}
