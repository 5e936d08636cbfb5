// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::SuiteFile;
use crate::dag::{group_by_lane, ActionGraph};
use crate::engine::{ActionUnit, Runtime, VariableScope};
use crate::errors::Result;
use crate::exec::PayloadRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - suite loading and validation
/// - payload registry and action graph
/// - the top-level runtime
///
/// Returns whether the run passed. Only configuration problems are errors.
pub async fn run(args: CliArgs) -> Result<bool> {
    let suite_path = PathBuf::from(&args.suite);
    let suite = load_and_validate(&suite_path)?;
    let registry = PayloadRegistry::with_builtins();
    let runtime = build_runtime(&suite, &registry)?;

    if args.dry_run {
        print_dry_run(&runtime);
        return Ok(true);
    }

    info!(suite = %suite_path.display(), "running suite");
    let report = runtime.run().await;
    Ok(report.success)
}

/// Build a ready-to-run [`Runtime`] from a validated suite.
///
/// The run-wide variable scope is seeded from `[config.variables]`.
pub fn build_runtime(suite: &SuiteFile, registry: &PayloadRegistry) -> Result<Runtime> {
    let actions = ActionGraph::from_config(&suite.actions, &suite.config.default_lane, registry)?;

    let scope = VariableScope::root();
    for (name, value) in &suite.config.variables {
        scope.set(name.clone(), Some(value.clone()));
    }

    Ok(Runtime::new(actions, scope))
}

/// Simple dry-run output: print lanes, actions, dependencies and policies.
fn print_dry_run(runtime: &Runtime) {
    println!("actionlane dry-run");
    print_units(runtime.units(), 1);
    debug!("dry-run complete (no execution)");
}

fn print_units(units: &[Arc<ActionUnit>], depth: usize) {
    let pad = "  ".repeat(depth);
    for (lane, seq) in group_by_lane(units) {
        println!("{pad}lane {lane}:");
        for unit in seq {
            let policy = unit.policy();
            println!("{pad}  - {}", unit.id());
            println!("{pad}      repeat: {}", policy.repeat);
            if let Some(n) = policy.expected {
                println!("{pad}      expected: {n}");
            }
            if let Some(n) = policy.at_least {
                println!("{pad}      atleast: {n}");
            }
            if unit.continues_on_failure() {
                println!("{pad}      continue_on_failure: true");
            }
            let deps = unit.dependencies();
            if !deps.is_empty() {
                let rendered: Vec<String> = deps
                    .iter()
                    .map(|(id, interval)| format!("{id} (+{}ms)", interval.as_millis()))
                    .collect();
                println!("{pad}      depends_on: {}", rendered.join(", "));
            }
            let children = unit.payload().children();
            if !children.is_empty() {
                print_units(children, depth + 3);
            }
        }
    }
}
